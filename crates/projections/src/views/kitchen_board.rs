//! Orders that are still moving through the restaurant.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, OrderEvent, OrderStatus, TableId, WaiterId};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One active order as the kitchen sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KitchenTicket {
    pub order_id: AggregateId,
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    pub total: Money,
    pub preparation_started_at: Option<DateTime<Utc>>,
}

/// Every order not yet paid or cancelled.
///
/// Tickets leave the board when their order reaches a terminal status.
#[derive(Clone, Default)]
pub struct KitchenBoardView {
    tickets: Arc<RwLock<HashMap<AggregateId, KitchenTicket>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl KitchenBoardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<KitchenTicket> {
        self.tickets.read().await.get(&order_id).cloned()
    }

    /// Orders in `pending` or `in_preparation`, oldest first.
    pub async fn open_orders(&self) -> Vec<KitchenTicket> {
        self.select(|status| status.is_open()).await
    }

    /// What the kitchen still has to cook: open orders plus delayed ones,
    /// oldest first.
    pub async fn kitchen_queue(&self) -> Vec<KitchenTicket> {
        self.select(|status| status.is_in_kitchen()).await
    }

    async fn select(&self, keep: impl Fn(OrderStatus) -> bool) -> Vec<KitchenTicket> {
        let mut tickets: Vec<_> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| keep(ticket.status))
            .cloned()
            .collect();
        tickets.sort_by_key(|ticket| (ticket.created_at, ticket.order_id));
        tickets
    }
}

#[async_trait]
impl Projection for KitchenBoardView {
    fn name(&self) -> &'static str {
        "KitchenBoardView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Order" {
            let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
            let order_id = event.aggregate_id;
            let mut tickets = self.tickets.write().await;

            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    tickets.insert(
                        order_id,
                        KitchenTicket {
                            order_id,
                            table_id: data.table_id,
                            waiter_id: data.waiter_id,
                            status: OrderStatus::Pending,
                            created_at: data.placed_at,
                            item_count: 0,
                            total: Money::zero(),
                            preparation_started_at: None,
                        },
                    );
                }
                OrderEvent::ItemsAdded(data) => {
                    if let Some(ticket) = tickets.get_mut(&order_id) {
                        ticket.item_count += data.items.len();
                        ticket.total +=
                            data.items.iter().map(|line| line.subtotal()).sum::<Money>();
                    }
                }
                OrderEvent::StatusChanged(data) => {
                    if data.new_status.is_terminal() {
                        tickets.remove(&order_id);
                    } else if let Some(ticket) = tickets.get_mut(&order_id) {
                        ticket.status = data.new_status;
                        ticket.preparation_started_at = data.preparation.started_at;
                    }
                }
                OrderEvent::PaymentRecorded(_) => {}
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
        self.tickets.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for KitchenBoardView {
    fn name(&self) -> &'static str {
        "KitchenBoardView"
    }

    fn count(&self) -> usize {
        self.tickets.try_read().map(|t| t.len()).unwrap_or(0)
    }
}
