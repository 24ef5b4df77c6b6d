//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded against an aggregate.
///
/// Events are immutable and named in past tense. The event type is stored
/// next to the payload in the journal so readers can filter without decoding.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced entity.
///
/// State is rebuilt by replaying events through [`Aggregate::apply`]. Command
/// methods live on the concrete type, read the current state and return the
/// events to record; they never mutate.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name stored in every envelope.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or `None` before its first event.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the version of the last applied event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate.
    ///
    /// Must be deterministic and infallible: the event already happened.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
