//! Per-session carts that check out into new orders.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use dashmap::DashMap;
use domain::{Cart, CartLine, ItemRequest, TableId, WaiterId};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::OrderOutcomeResponse;
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CheckoutRequest {
    pub table_id: Option<TableId>,
    pub waiter_id: Option<WaiterId>,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub session_id: String,
    pub lines: Vec<CartLine>,
    pub total_quantity: u32,
}

impl CartResponse {
    fn new(session_id: String, cart: &Cart) -> Self {
        Self {
            session_id,
            lines: cart.lines().to_vec(),
            total_quantity: cart.total_quantity(),
        }
    }
}

/// GET /sessions/:id/cart: an unknown session reads as an empty cart.
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<String>,
) -> Json<CartResponse> {
    let cart = state
        .carts
        .get(&session_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    Json(CartResponse::new(session_id, &cart))
}

/// POST /sessions/:id/cart/items: quantities merge per product.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<String>,
    Json(req): Json<ItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let mut cart = state.carts.entry(session_id.clone()).or_default();
    cart.add(req.product_id, req.quantity)?;
    Ok(Json(CartResponse::new(session_id, &cart)))
}

/// DELETE /sessions/:id/cart
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.carts.remove(&session_id);
    StatusCode::NO_CONTENT
}

/// POST /sessions/:id/cart/checkout: opens an order from the cart and
/// empties it. A failed checkout puts the lines back, keeping anything added
/// to the session while the checkout ran.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderOutcomeResponse>), ApiError> {
    let cart = state
        .carts
        .remove(&session_id)
        .map(|(_, cart)| cart)
        .unwrap_or_default();

    match state
        .coordinator
        .checkout(&cart, req.table_id, req.waiter_id)
        .await
    {
        Ok(outcome) => Ok((StatusCode::CREATED, Json(outcome.into()))),
        Err(e) => {
            if !cart.is_empty() {
                restore(&state.carts, session_id, cart);
            }
            Err(e.into())
        }
    }
}

/// Puts `cart` back under `session_id`, ahead of any lines the session
/// gained since it was taken.
fn restore(carts: &DashMap<String, Cart>, session_id: String, mut cart: Cart) {
    let mut entry = carts.entry(session_id).or_default();
    cart.merge(std::mem::take(&mut *entry));
    *entry = cart;
}
