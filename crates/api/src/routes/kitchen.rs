//! Kitchen and floor read models, view rebuilds and on-demand delay scans.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::WaiterId;
use event_store::EventStore;
use lifecycle::{DelayAlert, RebuildSummary};
use projections::{KitchenTicket, WaiterOrderSummary};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanParams {
    pub threshold_minutes: Option<u32>,
}

/// GET /kitchen/orders: pending, in-preparation and delayed orders, oldest first.
#[tracing::instrument(skip(state))]
pub async fn queue<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<KitchenTicket>>, ApiError> {
    Ok(Json(state.coordinator.kitchen_queue().await?))
}

/// GET /waiters/:id/orders: newest first.
#[tracing::instrument(skip(state))]
pub async fn waiter_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WaiterOrderSummary>>, ApiError> {
    let waiter_id = WaiterId::new(id);
    Ok(Json(state.coordinator.orders_for_waiter(&waiter_id).await?))
}

/// POST /delays/scan?threshold_minutes=N
///
/// Falls back to the configured threshold when none is given.
#[tracing::instrument(skip(state))]
pub async fn scan<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ScanParams>,
) -> Result<Json<Vec<DelayAlert>>, ApiError> {
    let threshold = params
        .threshold_minutes
        .unwrap_or(state.delay_threshold_minutes);
    Ok(Json(state.coordinator.scan_for_delays(threshold).await?))
}

/// POST /views/rebuild: replays the journal into empty views.
#[tracing::instrument(skip(state))]
pub async fn rebuild<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<RebuildSummary>, ApiError> {
    Ok(Json(state.coordinator.rebuild_views().await?))
}
