//! HTTP and WebSocket surface for the restaurant order lifecycle.
//!
//! Provides REST endpoints for orders, the kitchen queue, waiter listings
//! and session carts, a WebSocket feed of lifecycle notifications, and a
//! background delay scanner, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::SystemClock;
use domain::{InMemoryDirectory, OrderService};
use event_store::EventStore;
use lifecycle::LifecycleCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use notify::NotificationHub;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/items", post(routes::orders::add_items::<S>))
        .route("/orders/{id}/status", post(routes::orders::change_status::<S>))
        .route("/orders/{id}/serve", post(routes::orders::serve::<S>))
        .route("/orders/{id}/delay", post(routes::orders::delay::<S>))
        .route("/orders/{id}/payment", post(routes::orders::record_payment::<S>))
        .route(
            "/orders/{id}/payment/coverage",
            get(routes::orders::coverage::<S>),
        )
        .route("/orders/{id}/events", get(routes::orders::events::<S>))
        .route("/kitchen/orders", get(routes::kitchen::queue::<S>))
        .route("/waiters/{id}/orders", get(routes::kitchen::waiter_orders::<S>))
        .route("/delays/scan", post(routes::kitchen::scan::<S>))
        .route("/views/rebuild", post(routes::kitchen::rebuild::<S>))
        .route(
            "/sessions/{id}/cart",
            get(routes::carts::get::<S>).delete(routes::carts::clear::<S>),
        )
        .route("/sessions/{id}/cart/items", post(routes::carts::add_item::<S>))
        .route(
            "/sessions/{id}/cart/checkout",
            post(routes::carts::checkout::<S>),
        )
        .route("/ws/orders", get(routes::ws::subscribe::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the order service, hub and read models over `event_store`.
///
/// `directory` answers product, table and waiter lookups.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
    directory: Arc<InMemoryDirectory>,
) -> Arc<AppState<S>> {
    let service = OrderService::new(event_store)
        .with_clock(Arc::new(SystemClock))
        .with_regression_policy(config.regression_policy)
        .with_max_attempts(config.command_max_attempts);
    let hub = NotificationHub::new(config.subscriber_buffer);
    let coordinator = LifecycleCoordinator::new(service, hub, directory);

    Arc::new(AppState::new(
        Arc::new(coordinator),
        config.delay_threshold_minutes,
    ))
}
