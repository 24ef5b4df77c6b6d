//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod ledger;
mod payment;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::*;
pub use events::{
    ItemsAddedData, OrderEvent, OrderPlacedData, PaymentRecordedData, StatusChangedData,
};
pub use ledger::{ItemRequest, PricedItems, SkipReason, SkippedItem, price_items};
pub use payment::Payment;
pub use service::OrderService;
pub use status::{OrderStatus, PreparationTimes, RegressionPolicy, UnknownPolicy};
pub use value_objects::{LineItem, Money, PaymentMethod, ProductId, TableId, WaiterId};

use common::AggregateId;
use thiserror::Error;

/// Business rule violations on orders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: AggregateId },

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    #[error("Table not found: {table_id}")]
    TableNotFound { table_id: TableId },

    #[error("Waiter not found: {waiter_id}")]
    WaiterNotFound { waiter_id: WaiterId },

    /// The value is not one of the order statuses.
    #[error("Invalid status: '{value}'")]
    InvalidStatus { value: String },

    /// The value is not one of the payment methods.
    #[error("Invalid payment method: '{value}'")]
    InvalidMethod { value: String },

    #[error("Order already has a payment")]
    DuplicatePayment,

    /// No requested item could be turned into a line.
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid state transition: cannot move from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    /// `paid` was requested without a payment.
    #[error("An order can only become paid by recording a payment")]
    PaymentRequired,

    #[error("Items cannot be added to an order that is {status}")]
    ItemsLocked { status: OrderStatus },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid payment amount: {amount}")]
    InvalidAmount { amount: Money },

    #[error("Order already placed")]
    AlreadyPlaced,
}
