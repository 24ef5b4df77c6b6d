//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{LineItem, OrderStatus, Payment, PreparationTimes, TableId, WaiterId};

/// Events recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was opened for a table.
    OrderPlaced(OrderPlacedData),

    /// Priced lines were added.
    ItemsAdded(ItemsAddedData),

    /// Status moved, with the preparation times that resulted.
    StatusChanged(StatusChangedData),

    /// The bill was settled.
    PaymentRecorded(PaymentRecordedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::ItemsAdded(_) => "ItemsAdded",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::PaymentRecorded(_) => "PaymentRecorded",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
    pub placed_at: DateTime<Utc>,
}

/// Data for ItemsAdded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsAddedData {
    /// Lines with their captured unit prices.
    pub items: Vec<LineItem>,
    pub added_at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_at: DateTime<Utc>,

    /// Preparation times after the change. Replay takes them as recorded.
    pub preparation: PreparationTimes,
}

/// Data for PaymentRecorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedData {
    pub payment: Payment,
}

impl OrderEvent {
    pub fn order_placed(
        order_id: AggregateId,
        table_id: Option<TableId>,
        waiter_id: Option<WaiterId>,
        placed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            table_id,
            waiter_id,
            placed_at,
        })
    }

    pub fn items_added(items: Vec<LineItem>, added_at: DateTime<Utc>) -> Self {
        OrderEvent::ItemsAdded(ItemsAddedData { items, added_at })
    }

    pub fn status_changed(
        old_status: OrderStatus,
        new_status: OrderStatus,
        changed_at: DateTime<Utc>,
        preparation: PreparationTimes,
    ) -> Self {
        OrderEvent::StatusChanged(StatusChangedData {
            old_status,
            new_status,
            changed_at,
            preparation,
        })
    }

    pub fn payment_recorded(payment: Payment) -> Self {
        OrderEvent::PaymentRecorded(PaymentRecordedData { payment })
    }
}
