//! Orders grouped by the waiter who placed them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, OrderEvent, OrderStatus, PaymentMethod, TableId, WaiterId};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaiterOrderSummary {
    pub order_id: AggregateId,
    pub table_id: Option<TableId>,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub paid_with: Option<PaymentMethod>,
}

#[derive(Default)]
struct WaiterIndex {
    orders: HashMap<AggregateId, WaiterOrderSummary>,
    by_waiter: HashMap<WaiterId, Vec<AggregateId>>,
}

/// Every order a waiter has taken, terminal ones included.
///
/// Orders placed without a waiter are not tracked.
#[derive(Clone, Default)]
pub struct WaiterOrdersView {
    index: Arc<RwLock<WaiterIndex>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl WaiterOrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first.
    pub async fn orders_for(&self, waiter_id: &WaiterId) -> Vec<WaiterOrderSummary> {
        let index = self.index.read().await;
        let mut orders: Vec<_> = index
            .by_waiter
            .get(waiter_id)
            .into_iter()
            .flatten()
            .filter_map(|order_id| index.orders.get(order_id).cloned())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub async fn waiter_count(&self) -> usize {
        self.index.read().await.by_waiter.len()
    }
}

#[async_trait]
impl Projection for WaiterOrdersView {
    fn name(&self) -> &'static str {
        "WaiterOrdersView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Order" {
            let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
            let order_id = event.aggregate_id;
            let mut index = self.index.write().await;

            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    if let Some(waiter_id) = data.waiter_id {
                        index.orders.insert(
                            order_id,
                            WaiterOrderSummary {
                                order_id,
                                table_id: data.table_id,
                                status: OrderStatus::Pending,
                                total: Money::zero(),
                                created_at: data.placed_at,
                                paid_with: None,
                            },
                        );
                        index.by_waiter.entry(waiter_id).or_default().push(order_id);
                    }
                }
                OrderEvent::ItemsAdded(data) => {
                    if let Some(summary) = index.orders.get_mut(&order_id) {
                        summary.total +=
                            data.items.iter().map(|line| line.subtotal()).sum::<Money>();
                    }
                }
                OrderEvent::StatusChanged(data) => {
                    if let Some(summary) = index.orders.get_mut(&order_id) {
                        summary.status = data.new_status;
                    }
                }
                OrderEvent::PaymentRecorded(data) => {
                    if let Some(summary) = index.orders.get_mut(&order_id) {
                        summary.paid_with = Some(data.payment.method);
                    }
                }
            }
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        *self.index.write().await = WaiterIndex::default();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for WaiterOrdersView {
    fn name(&self) -> &'static str {
        "WaiterOrdersView"
    }

    fn count(&self) -> usize {
        self.index.try_read().map(|i| i.orders.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{DomainEvent, Payment, PreparationTimes};
    use event_store::Version;

    fn envelope(aggregate_id: AggregateId, version: i64, event: &OrderEvent) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type(event.event_type())
            .version(Version::new(version))
            .payload(event)
            .unwrap()
            .build()
            .unwrap()
    }

    async fn place(
        view: &WaiterOrdersView,
        waiter: Option<&str>,
        at: DateTime<Utc>,
    ) -> AggregateId {
        let order_id = AggregateId::new();
        let event = OrderEvent::order_placed(order_id, None, waiter.map(WaiterId::from), at);
        view.handle(&envelope(order_id, 1, &event)).await.unwrap();
        order_id
    }

    #[tokio::test]
    async fn orders_are_listed_per_waiter_newest_first() {
        let view = WaiterOrdersView::new();
        let now = Utc::now();
        let older = place(&view, Some("ana"), now - Duration::minutes(5)).await;
        let newer = place(&view, Some("ana"), now).await;
        place(&view, Some("luis"), now).await;
        place(&view, None, now).await;

        let ana: Vec<_> = view
            .orders_for(&WaiterId::from("ana"))
            .await
            .iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(ana, vec![newer, older]);
        assert_eq!(view.waiter_count().await, 2);
        assert_eq!(view.count(), 3);
        assert!(view.orders_for(&WaiterId::from("nobody")).await.is_empty());
    }

    #[tokio::test]
    async fn paid_orders_stay_listed_with_their_method() {
        let view = WaiterOrdersView::new();
        let order_id = place(&view, Some("ana"), Utc::now()).await;
        let now = Utc::now();

        let events = [
            OrderEvent::payment_recorded(Payment {
                method: PaymentMethod::Qr,
                amount: Money::from_cents(900),
                paid_at: now,
                notes: None,
            }),
            OrderEvent::status_changed(
                OrderStatus::Pending,
                OrderStatus::Paid,
                now,
                PreparationTimes::default(),
            ),
        ];
        for (offset, event) in events.iter().enumerate() {
            view.handle(&envelope(order_id, 2 + offset as i64, event))
                .await
                .unwrap();
        }

        let orders = view.orders_for(&WaiterId::from("ana")).await;
        assert_eq!(orders[0].status, OrderStatus::Paid);
        assert_eq!(orders[0].paid_with, Some(PaymentMethod::Qr));
    }

    #[tokio::test]
    async fn reset_forgets_everything() {
        let view = WaiterOrdersView::new();
        place(&view, Some("ana"), Utc::now()).await;

        view.reset().await.unwrap();
        assert_eq!(view.waiter_count().await, 0);
        assert_eq!(view.position().await.events_processed, 0);
    }
}
