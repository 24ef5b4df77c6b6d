use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Debug, Default)]
struct Journal {
    /// One stream per aggregate, index `n` holds version `n + 1`.
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,
    /// Append order across all streams, as (aggregate, index in stream).
    log: Vec<(AggregateId, usize)>,
}

impl Journal {
    fn version_of(&self, aggregate_id: &AggregateId) -> Version {
        self.streams
            .get(aggregate_id)
            .map(|stream| Version::from_len(stream.len()))
            .unwrap_or_else(Version::initial)
    }
}

/// In-memory journal.
///
/// The whole journal sits behind one lock, so the version check and the
/// write in [`EventStore::append`] happen as a single step.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    journal: Arc<RwLock<Journal>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.journal.read().await.log.len()
    }

    /// Returns the number of distinct aggregates with at least one event.
    pub async fn aggregate_count(&self) -> usize {
        self.journal.read().await.streams.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;

        let mut journal = self.journal.write().await;
        let current_version = journal.version_of(&aggregate_id);

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            tracing::debug!(%aggregate_id, %expected, actual = %current_version, "append rejected");
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        if first_new_version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: first_new_version,
                actual: current_version,
            });
        }

        let appended = events.len();
        let journal = &mut *journal;
        let stream = journal.streams.entry(aggregate_id).or_default();
        let start = stream.len();
        stream.extend(events);
        journal
            .log
            .extend((start..start + appended).map(|index| (aggregate_id, index)));

        metrics::counter!("journal_events_appended_total").increment(appended as u64);

        Ok(Version::from_len(start + appended))
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let journal = self.journal.read().await;
        Ok(journal
            .streams
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let journal = self.journal.read().await;
        Ok(journal
            .streams
            .get(&aggregate_id)
            .map(|stream| Version::from_len(stream.len())))
    }

    async fn stream_events_from(&self, position: u64) -> Result<EventStream> {
        use futures_util::stream;

        let journal = self.journal.read().await;
        let events: Vec<EventEnvelope> = journal
            .log
            .iter()
            .skip(position as usize)
            .filter_map(|(aggregate_id, index)| {
                journal
                    .streams
                    .get(aggregate_id)
                    .and_then(|stream| stream.get(*index))
                    .cloned()
            })
            .collect();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn create_test_event(
        aggregate_id: AggregateId,
        version: Version,
        event_type: &str,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type(event_type)
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let event = create_test_event(aggregate_id, Version::first(), "OrderPlaced");

        let version = store
            .append(vec![event], AppendOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(store.aggregate_count().await, 1);
    }

    #[tokio::test]
    async fn append_batch_returns_last_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let events = vec![
            create_test_event(aggregate_id, Version::new(1), "OrderPlaced"),
            create_test_event(aggregate_id, Version::new(2), "ItemsAdded"),
            create_test_event(aggregate_id, Version::new(3), "StatusChanged"),
        ];

        let version = store
            .append(events, AppendOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::new(3));
        assert_eq!(
            store.get_aggregate_version(aggregate_id).await.unwrap(),
            Some(Version::new(3))
        );
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        store
            .append(
                vec![create_test_event(aggregate_id, Version::first(), "OrderPlaced")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event(aggregate_id, Version::first(), "StatusChanged")],
                AppendOptions::expect_new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn unchecked_append_still_requires_next_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let result = store
            .append(
                vec![create_test_event(aggregate_id, Version::new(3), "StatusChanged")],
                AppendOptions::new(),
            )
            .await;

        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn concurrent_writers_at_same_version_only_one_wins() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        store
            .append(
                vec![create_test_event(aggregate_id, Version::first(), "OrderPlaced")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        vec![create_test_event(aggregate_id, Version::new(2), "PaymentRecorded")],
                        AppendOptions::expect_version(Version::first()),
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn unknown_aggregate_has_no_version() {
        let store = InMemoryEventStore::new();
        let version = store
            .get_aggregate_version(AggregateId::new())
            .await
            .unwrap();
        assert!(version.is_none());
    }

    #[tokio::test]
    async fn stream_preserves_append_order_across_aggregates() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let second = AggregateId::new();

        store
            .append(
                vec![create_test_event(first, Version::first(), "OrderPlaced")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(second, Version::first(), "OrderPlaced")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(first, Version::new(2), "StatusChanged")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let all: Vec<_> = store
            .stream_events_from(0)
            .await
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;
        let order: Vec<_> = all.iter().map(|e| (e.aggregate_id, e.version)).collect();
        assert_eq!(
            order,
            vec![
                (first, Version::first()),
                (second, Version::first()),
                (first, Version::new(2)),
            ]
        );

        let tail: Vec<_> = store
            .stream_events_from(2)
            .await
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].event_type, "StatusChanged");
    }
}
