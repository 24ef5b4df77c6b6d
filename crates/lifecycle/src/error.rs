use common::AggregateId;
use domain::{DomainError, OrderError};
use projections::ProjectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// The order was placed but none of its items could be priced. It is
    /// left `pending` under `order_id`.
    #[error("Order {order_id} has no resolvable items")]
    EmptyOrder { order_id: AggregateId },
}

impl From<OrderError> for LifecycleError {
    fn from(err: OrderError) -> Self {
        LifecycleError::Domain(DomainError::Order(err))
    }
}

impl LifecycleError {
    /// Returns the order rule violation, if that is what this error is.
    pub fn as_order_error(&self) -> Option<&OrderError> {
        match self {
            LifecycleError::Domain(e) => e.as_order_error(),
            _ => None,
        }
    }

    /// True for either flavour of "nothing could be priced".
    pub fn is_empty_order(&self) -> bool {
        matches!(self, LifecycleError::EmptyOrder { .. })
            || matches!(self.as_order_error(), Some(OrderError::EmptyOrder))
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
