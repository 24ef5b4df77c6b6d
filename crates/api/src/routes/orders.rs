//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    ItemRequest, Money, Order, OrderStatus, PaymentMethod, SkippedItem, TableId, WaiterId,
};
use event_store::EventStore;
use lifecycle::{OrderOutcome, OrderRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
    #[serde(default)]
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub method: String,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub preparation_started_at: Option<DateTime<Utc>>,
    pub preparation_ended_at: Option<DateTime<Utc>>,
    pub preparation_minutes: Option<f64>,
    pub payment: Option<PaymentResponse>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct OrderOutcomeResponse {
    pub order: OrderResponse,
    /// Requested items that were not added.
    pub skipped: Vec<SkippedItem>,
}

#[derive(Serialize)]
pub struct CoverageResponse {
    pub order_id: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub fully_covered: bool,
}

#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

impl OrderResponse {
    pub fn new(order_id: AggregateId, order: &Order) -> Self {
        let preparation = order.preparation();
        Self {
            id: order_id.to_string(),
            table_id: order.table_id(),
            waiter_id: order.waiter_id().cloned(),
            status: order.status(),
            created_at: order.created_at(),
            items: order
                .items()
                .iter()
                .map(|item| LineItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    subtotal_cents: item.subtotal().cents(),
                })
                .collect(),
            total_cents: order.total().cents(),
            preparation_started_at: preparation.started_at,
            preparation_ended_at: preparation.ended_at,
            preparation_minutes: order.preparation_minutes(),
            payment: order.payment().map(|payment| PaymentResponse {
                method: payment.method,
                amount_cents: payment.amount.cents(),
                paid_at: payment.paid_at,
                notes: payment.notes.clone(),
            }),
        }
    }
}

impl From<OrderOutcome> for OrderOutcomeResponse {
    fn from(outcome: OrderOutcome) -> Self {
        Self {
            order: OrderResponse::new(outcome.order_id, &outcome.order),
            skipped: outcome.skipped,
        }
    }
}

// -- Handlers --

/// POST /orders: open an order and add its first items.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderOutcomeResponse>), ApiError> {
    let outcome = state
        .coordinator
        .place_order(OrderRequest {
            table_id: req.table_id,
            waiter_id: req.waiter_id,
            items: req.items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.get_order(order_id).await?;
    Ok(Json(OrderResponse::new(order_id, &order)))
}

/// POST /orders/:id/items
#[tracing::instrument(skip(state, req))]
pub async fn add_items<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> Result<Json<OrderOutcomeResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let outcome = state.coordinator.add_items(order_id, &req.items).await?;
    Ok(Json(outcome.into()))
}

/// POST /orders/:id/status
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let status: OrderStatus = req.status.parse()?;
    let order = state.coordinator.transition(order_id, status).await?;
    Ok(Json(OrderResponse::new(order_id, &order)))
}

/// POST /orders/:id/serve
#[tracing::instrument(skip(state))]
pub async fn serve<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.mark_served(order_id).await?;
    Ok(Json(OrderResponse::new(order_id, &order)))
}

/// POST /orders/:id/delay
#[tracing::instrument(skip(state))]
pub async fn delay<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.mark_delayed(order_id).await?;
    Ok(Json(OrderResponse::new(order_id, &order)))
}

/// POST /orders/:id/payment: record the payment and close the order.
#[tracing::instrument(skip(state, req))]
pub async fn record_payment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let method: PaymentMethod = req.method.parse()?;
    let order = state
        .coordinator
        .record_payment(
            order_id,
            method,
            Money::from_cents(req.amount_cents),
            req.notes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::new(order_id, &order))))
}

/// GET /orders/:id/payment/coverage
#[tracing::instrument(skip(state))]
pub async fn coverage<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CoverageResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.get_order(order_id).await?;
    Ok(Json(CoverageResponse {
        order_id: order_id.to_string(),
        total_cents: order.total().cents(),
        paid_cents: order.payment().map_or(0, |payment| payment.amount.cents()),
        fully_covered: order.is_fully_covered(),
    }))
}

/// GET /orders/:id/events: the order's journal, oldest first.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let envelopes = state.coordinator.service().journal(order_id).await?;

    let responses = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

pub(crate) fn parse_order_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id '{id}': {e}")))
}
