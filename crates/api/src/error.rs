//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use lifecycle::LifecycleError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Domain(DomainError),
    Lifecycle(LifecycleError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut order_id = None;
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(&err),
            ApiError::Lifecycle(err) => match &err {
                LifecycleError::Domain(inner) => domain_error_to_response(inner),
                LifecycleError::EmptyOrder { order_id: id } => {
                    order_id = Some(id.to_string());
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
                }
                LifecycleError::Projection(_) => internal(err.to_string()),
            },
            ApiError::Internal(msg) => internal(msg),
        };

        let mut body = serde_json::json!({ "error": message });
        if let Some(order_id) = order_id {
            body["order_id"] = serde_json::Value::String(order_id);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn internal(msg: String) -> (StatusCode, String) {
    tracing::error!(error = %msg, "internal server error");
    (StatusCode::INTERNAL_SERVER_ERROR, msg)
}

fn domain_error_to_response(err: &DomainError) -> (StatusCode, String) {
    let status = match err {
        DomainError::Order(order_err) => order_error_status(order_err),
        DomainError::EventStore(store_err) if store_err.is_conflict() => StatusCode::CONFLICT,
        _ => return internal(err.to_string()),
    };
    (status, err.to_string())
}

fn order_error_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::OrderNotFound { .. }
        | OrderError::ProductNotFound { .. }
        | OrderError::TableNotFound { .. }
        | OrderError::WaiterNotFound { .. } => StatusCode::NOT_FOUND,
        OrderError::InvalidStatus { .. }
        | OrderError::InvalidMethod { .. }
        | OrderError::InvalidQuantity { .. }
        | OrderError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
        OrderError::DuplicatePayment
        | OrderError::InvalidStateTransition { .. }
        | OrderError::PaymentRequired
        | OrderError::ItemsLocked { .. }
        | OrderError::AlreadyPlaced => StatusCode::CONFLICT,
        OrderError::EmptyOrder => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Domain(DomainError::Order(err))
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use domain::OrderStatus;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn order_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(OrderError::OrderNotFound {
                order_id: AggregateId::new()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::InvalidStatus {
                value: "eaten".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(OrderError::DuplicatePayment), StatusCode::CONFLICT);
        assert_eq!(
            status_of(OrderError::InvalidStateTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Pending
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::EmptyOrder),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn placed_but_empty_order_is_unprocessable() {
        let err = LifecycleError::EmptyOrder {
            order_id: AggregateId::new(),
        };
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
