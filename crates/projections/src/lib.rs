//! Query-side views over the order journal.
//!
//! - [`Projection`] folds journal events into a view
//! - [`ProjectionProcessor`] replays the journal's global log into projections
//! - [`KitchenBoardView`] tracks every active order; the delay scan and the
//!   kitchen queue read from it
//! - [`WaiterOrdersView`] lists orders per waiter

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{KitchenBoardView, KitchenTicket, WaiterOrderSummary, WaiterOrdersView};
