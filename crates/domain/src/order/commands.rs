//! Order commands.

use common::AggregateId;

use crate::command::Command;

use super::{LineItem, Money, Order, OrderStatus, PaymentMethod, TableId, WaiterId};

/// Command to open a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
}

impl PlaceOrder {
    /// Creates a PlaceOrder command with a generated order ID.
    pub fn new(table_id: Option<TableId>, waiter_id: Option<WaiterId>) -> Self {
        Self {
            order_id: AggregateId::new(),
            table_id,
            waiter_id,
        }
    }

    /// Creates a PlaceOrder command with no table or waiter.
    pub fn walk_in() -> Self {
        Self::new(None, None)
    }
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to append priced lines to an order.
#[derive(Debug, Clone)]
pub struct AddItems {
    pub order_id: AggregateId,
    pub items: Vec<LineItem>,
}

impl AddItems {
    pub fn new(order_id: AggregateId, items: Vec<LineItem>) -> Self {
        Self { order_id, items }
    }
}

impl Command for AddItems {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to move an order to another status.
#[derive(Debug, Clone)]
pub struct ChangeStatus {
    pub order_id: AggregateId,
    pub status: OrderStatus,
}

impl ChangeStatus {
    pub fn new(order_id: AggregateId, status: OrderStatus) -> Self {
        Self { order_id, status }
    }
}

impl Command for ChangeStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to settle an order.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub order_id: AggregateId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub notes: Option<String>,
}

impl RecordPayment {
    pub fn new(order_id: AggregateId, method: PaymentMethod, amount: Money) -> Self {
        Self {
            order_id,
            method,
            amount,
            notes: None,
        }
    }

    /// Attaches a cashier remark.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Command for RecordPayment {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}
