//! Runs order commands and announces what they persisted.

use std::sync::Arc;

use common::{AggregateId, Clock};
use domain::{
    AddItems, Cart, Catalog, ChangeStatus, CommandResult, ItemRequest, Money, Order, OrderError,
    OrderService, OrderStatus, PaymentMethod, PlaceOrder, RecordPayment, SkippedItem, TableId,
    TableRegistry, WaiterId, WaiterRegistry, price_items,
};
use event_store::EventStore;
use notify::{Notification, NotificationHub};
use projections::{
    KitchenBoardView, KitchenTicket, ProjectionProcessor, ReadModel, WaiterOrderSummary,
    WaiterOrdersView,
};
use serde::Serialize;

use crate::delay::{DelayAlert, DelayDetector};
use crate::{LifecycleError, Result};

/// What to open: where, by whom, and the first batch of items.
#[derive(Debug, Clone, Default)]
pub struct OrderRequest {
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
    pub items: Vec<ItemRequest>,
}

/// An order after a command, plus the requested items that were not added.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
    pub order_id: AggregateId,
    pub order: Order,
    pub skipped: Vec<SkippedItem>,
}

/// Read model sizes after the journal was replayed from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    pub events_replayed: u64,
    pub projections: usize,
    pub kitchen_tickets: usize,
    pub waiter_orders: usize,
}

/// Entry point for every lifecycle operation.
///
/// Each operation persists first and publishes second, so an observer never
/// hears about a change the journal does not hold. A failed publish cannot
/// fail the operation.
pub struct LifecycleCoordinator<S: EventStore> {
    service: OrderService<S>,
    hub: NotificationHub,
    catalog: Arc<dyn Catalog>,
    tables: Arc<dyn TableRegistry>,
    waiters: Arc<dyn WaiterRegistry>,
    processor: Arc<ProjectionProcessor<S>>,
    board: KitchenBoardView,
    waiter_orders: WaiterOrdersView,
    delays: DelayDetector<S>,
}

impl<S: EventStore + Clone + 'static> LifecycleCoordinator<S> {
    /// `directory` answers product, table and waiter lookups.
    pub fn new<D>(service: OrderService<S>, hub: NotificationHub, directory: Arc<D>) -> Self
    where
        D: Catalog + TableRegistry + WaiterRegistry + 'static,
    {
        let board = KitchenBoardView::new();
        let waiter_orders = WaiterOrdersView::new();
        let mut processor = ProjectionProcessor::new(service.handler().store().clone());
        processor.register(Arc::new(board.clone()));
        processor.register(Arc::new(waiter_orders.clone()));
        let processor = Arc::new(processor);

        let delays = DelayDetector::new(
            Arc::clone(&processor),
            board.clone(),
            hub.clone(),
            Arc::clone(service.clock()),
        );

        Self {
            service,
            hub,
            catalog: directory.clone(),
            tables: directory.clone(),
            waiters: directory,
            processor,
            board,
            waiter_orders,
            delays,
        }
    }
}

impl<S: EventStore> LifecycleCoordinator<S> {
    pub fn service(&self) -> &OrderService<S> {
        &self.service
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.service.clock()
    }

    /// Opens an order and adds its first items.
    ///
    /// Unknown table or waiter references fail before anything is written.
    /// When none of the items can be priced the order stays `pending` and
    /// the error carries its id.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(&self, request: OrderRequest) -> Result<OrderOutcome> {
        let OrderRequest {
            table_id,
            waiter_id,
            items,
        } = request;

        if let Some(table_id) = table_id
            && self.tables.resolve_table(table_id).await.is_none()
        {
            return Err(OrderError::TableNotFound { table_id }.into());
        }
        if let Some(waiter_id) = &waiter_id
            && self.waiters.resolve_waiter(waiter_id).await.is_none()
        {
            return Err(OrderError::WaiterNotFound {
                waiter_id: waiter_id.clone(),
            }
            .into());
        }

        let cmd = PlaceOrder::new(table_id, waiter_id);
        let order_id = cmd.order_id;
        let placed = self.service.place_order(cmd).await?;
        self.announce(order_id, &placed);

        match self.add_priced_items(order_id, &items).await {
            Err(e) if e.is_empty_order() => {
                tracing::warn!(%order_id, "order placed without any resolvable items");
                Err(LifecycleError::EmptyOrder { order_id })
            }
            other => other,
        }
    }

    /// Prices `items` at current catalog prices and appends them.
    ///
    /// Unknown products are skipped and returned in the outcome; the call
    /// fails with `EmptyOrder` only if nothing could be added.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn add_items(
        &self,
        order_id: AggregateId,
        items: &[ItemRequest],
    ) -> Result<OrderOutcome> {
        self.service.require_order(order_id).await?;
        self.add_priced_items(order_id, items).await
    }

    async fn add_priced_items(
        &self,
        order_id: AggregateId,
        items: &[ItemRequest],
    ) -> Result<OrderOutcome> {
        let priced = price_items(self.catalog.as_ref(), items).await?;
        let result = self
            .service
            .add_items(AddItems::new(order_id, priced.lines))
            .await?;
        self.announce(order_id, &result);

        if !priced.skipped.is_empty() {
            tracing::info!(%order_id, skipped = priced.skipped.len(), "some items were skipped");
        }
        Ok(OrderOutcome {
            order_id,
            order: result.aggregate,
            skipped: priced.skipped,
        })
    }

    /// Moves an order to `status`. Requesting the status it already has
    /// changes and announces nothing.
    #[tracing::instrument(skip(self))]
    pub async fn transition(&self, order_id: AggregateId, status: OrderStatus) -> Result<Order> {
        let result = self
            .service
            .change_status(ChangeStatus::new(order_id, status))
            .await?;
        self.announce(order_id, &result);
        Ok(result.aggregate)
    }

    pub async fn mark_served(&self, order_id: AggregateId) -> Result<Order> {
        self.transition(order_id, OrderStatus::Served).await
    }

    /// Moves an order to `delayed` and follows its `StatusChanged` with an
    /// `OrderDelayed` alert.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delayed(&self, order_id: AggregateId) -> Result<Order> {
        let result = self
            .service
            .change_status(ChangeStatus::new(order_id, OrderStatus::Delayed))
            .await?;

        if !result.events.is_empty() {
            self.announce(order_id, &result);
            let order = &result.aggregate;
            self.hub.publish(Notification::OrderDelayed {
                order_id,
                elapsed_minutes: self.clock().minutes_since(order.created_at()),
                table_id: order.table_id(),
            });
        }
        Ok(result.aggregate)
    }

    /// Records the order's single payment and closes it as `paid`.
    ///
    /// Announces `PaymentRecorded` and then `StatusChanged`.
    #[tracing::instrument(skip(self, notes))]
    pub async fn record_payment(
        &self,
        order_id: AggregateId,
        method: PaymentMethod,
        amount: Money,
        notes: Option<String>,
    ) -> Result<Order> {
        let mut cmd = RecordPayment::new(order_id, method, amount);
        if let Some(notes) = notes {
            cmd = cmd.with_notes(notes);
        }
        let result = self.service.record_payment(cmd).await?;
        self.announce(order_id, &result);
        Ok(result.aggregate)
    }

    pub async fn is_fully_covered(&self, order_id: AggregateId) -> Result<bool> {
        Ok(self.service.is_fully_covered(order_id).await?)
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Result<Order> {
        Ok(self.service.require_order(order_id).await?)
    }

    /// Opens an order from a cart's lines. The cart itself is not touched.
    pub async fn checkout(
        &self,
        cart: &Cart,
        table_id: Option<TableId>,
        waiter_id: Option<WaiterId>,
    ) -> Result<OrderOutcome> {
        if cart.is_empty() {
            return Err(OrderError::EmptyOrder.into());
        }
        self.place_order(OrderRequest {
            table_id,
            waiter_id,
            items: cart.item_requests(),
        })
        .await
    }

    /// Publishes `DelayDetected` for every open order older than the
    /// threshold and returns the alerts.
    pub async fn scan_for_delays(&self, threshold_minutes: u32) -> Result<Vec<DelayAlert>> {
        self.delays.scan_for_delays(threshold_minutes).await
    }

    /// Pending, in-preparation and delayed orders, oldest first.
    pub async fn kitchen_queue(&self) -> Result<Vec<KitchenTicket>> {
        self.processor.run_catch_up().await?;
        Ok(self.board.kitchen_queue().await)
    }

    pub async fn orders_for_waiter(
        &self,
        waiter_id: &WaiterId,
    ) -> Result<Vec<WaiterOrderSummary>> {
        self.processor.run_catch_up().await?;
        Ok(self.waiter_orders.orders_for(waiter_id).await)
    }

    /// Drops every view and replays the whole journal into it.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_views(&self) -> Result<RebuildSummary> {
        let events_replayed = self.processor.rebuild_all().await?;
        let summary = RebuildSummary {
            events_replayed,
            projections: self.processor.projection_count(),
            kitchen_tickets: self.board.count(),
            waiter_orders: self.waiter_orders.count(),
        };
        tracing::info!(
            events = summary.events_replayed,
            kitchen_tickets = summary.kitchen_tickets,
            waiter_orders = summary.waiter_orders,
            "views rebuilt"
        );
        Ok(summary)
    }

    fn announce(&self, order_id: AggregateId, result: &CommandResult<Order>) {
        let notifications =
            Notification::from_events(order_id, &result.aggregate, &result.events);
        self.hub.publish_all(notifications);
    }
}
