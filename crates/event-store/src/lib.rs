//! Append-only journal backing the order aggregates.
//!
//! Every order owns one stream of versioned events. Appends carry the
//! version the writer last observed; a stale version is rejected with
//! [`EventStoreError::ConcurrencyConflict`], which is what makes a command's
//! read-modify-write atomic per order.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStream};
