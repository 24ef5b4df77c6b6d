//! Shared types for the order lifecycle workspace.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, minutes_between};
pub use types::{AggregateId, round_minutes};
