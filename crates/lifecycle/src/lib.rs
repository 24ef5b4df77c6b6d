//! Order lifecycle coordination.
//!
//! [`LifecycleCoordinator`] is what request handlers call. It resolves
//! directory references, runs the order commands, and once the journal holds
//! the result publishes the matching notifications. [`DelayDetector`] is the
//! on-demand scan for orders that have waited too long.

pub mod coordinator;
pub mod delay;
pub mod error;

pub use coordinator::{LifecycleCoordinator, OrderOutcome, OrderRequest, RebuildSummary};
pub use delay::{DelayAlert, DelayDetector};
pub use error::{LifecycleError, Result};
