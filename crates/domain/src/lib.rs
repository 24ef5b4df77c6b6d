//! Restaurant order domain.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - Command trait and a CommandHandler that retries on version conflicts
//! - The Order aggregate with its status machine, line items and payment
//! - Catalog, table and waiter lookups, and the per-session Cart

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod directory;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{Cart, CartLine};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_MAX_ATTEMPTS};
pub use directory::{
    Catalog, DirectoryError, DirectorySeed, InMemoryDirectory, Product, Table, TableRegistry,
    Waiter, WaiterRegistry,
};
pub use error::DomainError;
pub use order::{
    AddItems, ChangeStatus, ItemRequest, LineItem, Money, Order, OrderError, OrderEvent,
    OrderService, OrderStatus, Payment, PaymentMethod, PlaceOrder, PreparationTimes, PricedItems,
    ProductId, RecordPayment, RegressionPolicy, SkipReason, SkippedItem, TableId, WaiterId,
    price_items,
};
