//! Order service providing a simplified API for order operations.

use std::sync::Arc;

use common::{AggregateId, Clock, SystemClock};
use event_store::{EventEnvelope, EventStore};

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{AddItems, ChangeStatus, Order, OrderError, PlaceOrder, RecordPayment, RegressionPolicy};

/// Service for managing orders.
///
/// Wraps the command handler with the clock every command is stamped from
/// and the regression policy transitions are checked against.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
    clock: Arc<dyn Clock>,
    policy: RegressionPolicy,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a service on the system clock with the permissive policy.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
            clock: Arc::new(SystemClock),
            policy: RegressionPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_regression_policy(mut self, policy: RegressionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.handler = self.handler.with_max_attempts(max_attempts);
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn regression_policy(&self) -> RegressionPolicy {
        self.policy
    }

    /// Opens a new pending order.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let PlaceOrder {
            order_id,
            table_id,
            waiter_id,
        } = cmd;

        let result = self
            .handler
            .execute(order_id, |order| {
                order.place(order_id, table_id, waiter_id.clone(), self.clock.now())
            })
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        Ok(result)
    }

    /// Appends priced lines to a pending order.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, lines = cmd.items.len()))]
    pub async fn add_items(&self, cmd: AddItems) -> Result<CommandResult<Order>, DomainError> {
        let AddItems { order_id, items } = cmd;

        self.handler
            .execute(order_id, |order| {
                order.ensure_placed(order_id)?;
                order.add_items(items.clone(), self.clock.now())
            })
            .await
    }

    /// Moves an order to another status. Re-requesting the current status
    /// returns the order unchanged and with no events.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        cmd: ChangeStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        let ChangeStatus { order_id, status } = cmd;

        let result = self
            .handler
            .execute(order_id, |order| {
                order.ensure_placed(order_id)?;
                order.transition(status, self.policy, self.clock.now())
            })
            .await?;

        if !result.events.is_empty() {
            metrics::counter!("order_transitions_total", "status" => status.as_str())
                .increment(1);
            tracing::info!(%order_id, %status, "order status changed");
        }
        Ok(result)
    }

    /// Records the order's one payment and marks it paid.
    ///
    /// Of two concurrent payments on the same order exactly one is appended;
    /// the other is re-evaluated against the paid order and fails with
    /// `DuplicatePayment`.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, method = %cmd.method))]
    pub async fn record_payment(
        &self,
        cmd: RecordPayment,
    ) -> Result<CommandResult<Order>, DomainError> {
        let RecordPayment {
            order_id,
            method,
            amount,
            notes,
        } = cmd;

        let result = self
            .handler
            .execute(order_id, |order| {
                order.ensure_placed(order_id)?;
                order.record_payment(method, amount, notes.clone(), self.clock.now())
            })
            .await?;

        metrics::counter!("payments_recorded_total").increment(1);
        metrics::counter!("order_transitions_total", "status" => "paid").increment(1);
        tracing::info!(%order_id, %amount, "payment recorded");
        Ok(result)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Loads an order, failing with `OrderNotFound` if it doesn't exist.
    pub async fn require_order(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        self.get_order(order_id)
            .await?
            .ok_or(DomainError::Order(OrderError::OrderNotFound { order_id }))
    }

    /// Returns true if the order's payment covers its total. An order with no
    /// payment is not covered.
    pub async fn is_fully_covered(&self, order_id: AggregateId) -> Result<bool, DomainError> {
        Ok(self.require_order(order_id).await?.is_fully_covered())
    }

    /// Returns the order's recorded events, oldest first.
    pub async fn journal(&self, order_id: AggregateId) -> Result<Vec<EventEnvelope>, DomainError> {
        let events = self
            .handler
            .store()
            .get_events_for_aggregate(order_id)
            .await?;
        if events.is_empty() {
            return Err(OrderError::OrderNotFound { order_id }.into());
        }
        Ok(events)
    }
}
