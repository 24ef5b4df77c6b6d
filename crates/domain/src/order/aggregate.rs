//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{
    LineItem, Money, OrderError, OrderEvent, OrderStatus, Payment, PaymentMethod,
    PreparationTimes, RegressionPolicy, TableId, WaiterId,
    events::{ItemsAddedData, OrderPlacedData, StatusChangedData},
};

/// Order aggregate root.
///
/// Owns its line items and its payment. The total is recomputed from the
/// lines every time lines are added, never adjusted incrementally.
#[derive(Debug, Clone, Default)]
pub struct Order {
    id: Option<AggregateId>,
    version: Version,
    table_id: Option<TableId>,
    waiter_id: Option<WaiterId>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    preparation: PreparationTimes,
    items: Vec<LineItem>,
    total: Money,
    payment: Option<Payment>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::ItemsAdded(data) => self.apply_items_added(data),
            OrderEvent::StatusChanged(data) => self.apply_status_changed(data),
            OrderEvent::PaymentRecorded(data) => self.payment = Some(data.payment),
        }
    }
}

// Query methods
impl Order {
    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn waiter_id(&self) -> Option<&WaiterId> {
        self.waiter_id.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn preparation(&self) -> PreparationTimes {
        self.preparation
    }

    /// Preparation duration in minutes, present only once both ends are known.
    pub fn preparation_minutes(&self) -> Option<f64> {
        self.preparation.duration_minutes()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    /// Returns true if a payment exists and its amount covers the total.
    pub fn is_fully_covered(&self) -> bool {
        self.payment
            .as_ref()
            .is_some_and(|payment| payment.covers(self.total))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fails with `OrderNotFound` unless the order has been placed.
    pub fn ensure_placed(&self, order_id: AggregateId) -> Result<(), OrderError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(OrderError::OrderNotFound { order_id }),
        }
    }
}

// Command methods (return events)
impl Order {
    /// Opens a new order in `pending` with a zero total.
    pub fn place(
        &self,
        order_id: AggregateId,
        table_id: Option<TableId>,
        waiter_id: Option<WaiterId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        Ok(vec![OrderEvent::order_placed(
            order_id, table_id, waiter_id, now,
        )])
    }

    /// Appends already-priced lines. Only allowed while the order is pending.
    pub fn add_items(
        &self,
        lines: Vec<LineItem>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(OrderError::ItemsLocked {
                status: self.status,
            });
        }

        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        Ok(vec![OrderEvent::items_added(lines, now)])
    }

    /// Moves the order to `requested`.
    ///
    /// Requesting the current status yields no events. Terminal statuses
    /// cannot be left and `paid` needs a payment. Moving back along the main
    /// line is governed by `policy`.
    pub fn transition(
        &self,
        requested: OrderStatus,
        policy: RegressionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if requested == OrderStatus::Paid {
            return Err(OrderError::PaymentRequired);
        }

        if requested == self.status {
            return Ok(vec![]);
        }

        let invalid = OrderError::InvalidStateTransition {
            from: self.status,
            to: requested,
        };

        if self.status.is_terminal() {
            return Err(invalid);
        }

        let mut preparation = self.preparation;
        if self.status.is_regression_to(requested) {
            match policy {
                RegressionPolicy::Permit => {}
                RegressionPolicy::Reject => return Err(invalid),
                RegressionPolicy::ClearTimestamps => {
                    preparation = preparation.rewound_to(requested);
                }
            }
        }

        Ok(vec![OrderEvent::status_changed(
            self.status,
            requested,
            now,
            preparation.entering(requested, now),
        )])
    }

    /// Records the one payment and closes the order.
    ///
    /// Yields `PaymentRecorded` followed by the `StatusChanged` into `paid`.
    /// The amount is not checked against the total.
    pub fn record_payment(
        &self,
        method: PaymentMethod,
        amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.payment.is_some() {
            return Err(OrderError::DuplicatePayment);
        }

        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Paid,
            });
        }

        if amount.is_negative() {
            return Err(OrderError::InvalidAmount { amount });
        }

        let payment = Payment {
            method,
            amount,
            paid_at: now,
            notes,
        };

        Ok(vec![
            OrderEvent::payment_recorded(payment),
            OrderEvent::status_changed(
                self.status,
                OrderStatus::Paid,
                now,
                self.preparation.entering(OrderStatus::Paid, now),
            ),
        ])
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.table_id = data.table_id;
        self.waiter_id = data.waiter_id;
        self.created_at = data.placed_at;
        self.status = OrderStatus::Pending;
    }

    fn apply_items_added(&mut self, data: ItemsAddedData) {
        self.items.extend(data.items);
        self.total = self.items.iter().map(LineItem::subtotal).sum();
    }

    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.status = data.new_status;
        self.preparation = data.preparation;
    }
}
