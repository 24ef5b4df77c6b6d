//! Pull-based scan for orders that have waited too long.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use common::{AggregateId, Clock};
use domain::{OrderStatus, TableId};
use event_store::EventStore;
use notify::{Notification, NotificationHub};
use projections::{KitchenBoardView, ProjectionProcessor};
use serde::Serialize;

use crate::Result;

/// An open order older than the scan threshold. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayAlert {
    pub order_id: AggregateId,
    pub elapsed_minutes: f64,
    pub status: OrderStatus,
    pub table_id: Option<TableId>,
}

impl From<&DelayAlert> for Notification {
    fn from(alert: &DelayAlert) -> Self {
        Notification::DelayDetected {
            order_id: alert.order_id,
            elapsed_minutes: alert.elapsed_minutes,
            status: alert.status,
            table_id: alert.table_id,
        }
    }
}

/// Flags `pending` and `in_preparation` orders created before
/// `now - threshold`.
///
/// Scanning never changes an order's status; it only announces. Cadence is
/// the caller's business.
pub struct DelayDetector<S: EventStore> {
    processor: Arc<ProjectionProcessor<S>>,
    board: KitchenBoardView,
    hub: NotificationHub,
    clock: Arc<dyn Clock>,
}

impl<S: EventStore> DelayDetector<S> {
    /// `board` must be registered with `processor`.
    pub fn new(
        processor: Arc<ProjectionProcessor<S>>,
        board: KitchenBoardView,
        hub: NotificationHub,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            processor,
            board,
            hub,
            clock,
        }
    }

    /// Returns the overdue open orders, oldest first, and publishes one
    /// `DelayDetected` per order.
    #[tracing::instrument(skip(self))]
    pub async fn scan_for_delays(&self, threshold_minutes: u32) -> Result<Vec<DelayAlert>> {
        let started = Instant::now();
        self.processor.run_catch_up().await?;

        let now = self.clock.now();
        let cutoff = now - Duration::minutes(i64::from(threshold_minutes));
        let alerts: Vec<DelayAlert> = self
            .board
            .open_orders()
            .await
            .into_iter()
            .filter(|ticket| ticket.created_at < cutoff)
            .map(|ticket| DelayAlert {
                order_id: ticket.order_id,
                elapsed_minutes: common::minutes_between(ticket.created_at, now),
                status: ticket.status,
                table_id: ticket.table_id,
            })
            .collect();

        for alert in &alerts {
            tracing::warn!(
                order_id = %alert.order_id,
                elapsed_minutes = alert.elapsed_minutes,
                status = %alert.status,
                "order delayed"
            );
            self.hub.publish(alert.into());
        }

        metrics::counter!("delay_alerts_total").increment(alerts.len() as u64);
        metrics::histogram!("delay_scan_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(alerts)
    }
}
