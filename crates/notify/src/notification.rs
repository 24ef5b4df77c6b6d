//! Payloads pushed to observers.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, Order, OrderEvent, OrderStatus, PaymentMethod, TableId, WaiterId};
use serde::{Deserialize, Serialize};

/// A lifecycle announcement.
///
/// Serialized as `{"type": "<Variant>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notification {
    OrderPlaced {
        order_id: AggregateId,
        table_id: Option<TableId>,
        waiter_id: Option<WaiterId>,
        total: Money,
        placed_at: DateTime<Utc>,
    },

    ItemsAdded {
        order_id: AggregateId,
        /// Lines in this batch.
        item_count: usize,
        /// Order total after the batch.
        total: Money,
    },

    StatusChanged {
        order_id: AggregateId,
        old_status: OrderStatus,
        new_status: OrderStatus,
        preparation_started_at: Option<DateTime<Utc>>,
        preparation_ended_at: Option<DateTime<Utc>>,
        preparation_minutes: Option<f64>,
        changed_at: DateTime<Utc>,
    },

    /// Found by a delay scan. The order's status is not changed.
    DelayDetected {
        order_id: AggregateId,
        elapsed_minutes: f64,
        status: OrderStatus,
        table_id: Option<TableId>,
    },

    /// An order was explicitly marked `delayed`. Follows its `StatusChanged`.
    OrderDelayed {
        order_id: AggregateId,
        elapsed_minutes: f64,
        table_id: Option<TableId>,
    },

    PaymentRecorded {
        order_id: AggregateId,
        amount: Money,
        method: PaymentMethod,
    },
}

impl Notification {
    /// Returns the variant name, as sent in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OrderPlaced { .. } => "OrderPlaced",
            Notification::ItemsAdded { .. } => "ItemsAdded",
            Notification::StatusChanged { .. } => "StatusChanged",
            Notification::DelayDetected { .. } => "DelayDetected",
            Notification::OrderDelayed { .. } => "OrderDelayed",
            Notification::PaymentRecorded { .. } => "PaymentRecorded",
        }
    }

    pub fn order_id(&self) -> AggregateId {
        match self {
            Notification::OrderPlaced { order_id, .. }
            | Notification::ItemsAdded { order_id, .. }
            | Notification::StatusChanged { order_id, .. }
            | Notification::DelayDetected { order_id, .. }
            | Notification::OrderDelayed { order_id, .. }
            | Notification::PaymentRecorded { order_id, .. } => *order_id,
        }
    }

    /// Builds the announcements for events that were just persisted, in
    /// event order. `order` is the state after all of them.
    pub fn from_events(order_id: AggregateId, order: &Order, events: &[OrderEvent]) -> Vec<Self> {
        events
            .iter()
            .map(|event| match event {
                OrderEvent::OrderPlaced(data) => Notification::OrderPlaced {
                    order_id,
                    table_id: data.table_id,
                    waiter_id: data.waiter_id.clone(),
                    total: order.total(),
                    placed_at: data.placed_at,
                },
                OrderEvent::ItemsAdded(data) => Notification::ItemsAdded {
                    order_id,
                    item_count: data.items.len(),
                    total: order.total(),
                },
                OrderEvent::StatusChanged(data) => Notification::StatusChanged {
                    order_id,
                    old_status: data.old_status,
                    new_status: data.new_status,
                    preparation_started_at: data.preparation.started_at,
                    preparation_ended_at: data.preparation.ended_at,
                    preparation_minutes: data.preparation.duration_minutes(),
                    changed_at: data.changed_at,
                },
                OrderEvent::PaymentRecorded(data) => Notification::PaymentRecorded {
                    order_id,
                    amount: data.payment.amount,
                    method: data.payment.method,
                },
            })
            .collect()
    }
}
