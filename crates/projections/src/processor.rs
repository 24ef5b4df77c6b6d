//! Feeds the journal's global log into registered projections.

use std::sync::Arc;

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Delivers journal events to projections in append order.
///
/// Catch-up is pull-based: callers run it before reading a view. Concurrent
/// catch-ups are serialized so no event is delivered twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Arc<dyn Projection>>,
    catch_up_lock: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up_lock: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        tracing::debug!(projection = projection.name(), "projection registered");
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Delivers every event some projection has not seen yet.
    ///
    /// Returns how many journal events were read.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _guard = self.catch_up_lock.lock().await;
        self.deliver_unseen().await
    }

    async fn deliver_unseen(&self) -> Result<u64> {
        let mut positions = Vec::with_capacity(self.projections.len());
        for projection in &self.projections {
            positions.push(projection.position().await.events_processed);
        }
        let Some(start) = positions.iter().copied().min() else {
            return Ok(0);
        };

        let mut stream = self.store.stream_events_from(start).await?;
        let mut event_index = start;
        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for (projection, seen) in self.projections.iter().zip(&positions) {
                if *seen < event_index {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        let read = event_index - start;
        if read > 0 {
            tracing::debug!(events = read, position = event_index, "catch-up complete");
        }
        Ok(read)
    }

    /// Resets every projection and replays the whole journal.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        let _guard = self.catch_up_lock.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.deliver_unseen().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct CountingProjection {
        count: RwLock<u64>,
        position: RwLock<ProjectionPosition>,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn envelope(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type("StatusChanged")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    async fn store_with(events: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        if events > 0 {
            let agg_id = AggregateId::new();
            let batch = (1..=events).map(|v| envelope(agg_id, v)).collect();
            store.append(batch, AppendOptions::new()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn catch_up_delivers_each_event_once() {
        let store = store_with(3).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(projection.clone());

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(*projection.count.read().await, 3);

        let agg_id = AggregateId::new();
        store
            .append(vec![envelope(agg_id, 1)], AppendOptions::new())
            .await
            .unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(*projection.count.read().await, 4);
    }

    #[tokio::test]
    async fn late_projection_is_brought_up_from_zero() {
        let store = store_with(2).await;
        let early = Arc::new(CountingProjection::default());
        let late = Arc::new(CountingProjection::default());

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(early.clone());
        processor.run_catch_up().await.unwrap();

        processor.register(late.clone());
        processor.run_catch_up().await.unwrap();

        assert_eq!(*early.count.read().await, 2);
        assert_eq!(*late.count.read().await, 2);
    }

    #[tokio::test]
    async fn concurrent_catch_ups_do_not_double_deliver() {
        let store = store_with(20).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store);
        processor.register(projection.clone());
        let processor = Arc::new(processor);

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let processor = processor.clone();
            tasks.push(tokio::spawn(async move { processor.run_catch_up().await }));
        }
        let mut read = 0;
        for task in tasks {
            read += task.await.unwrap().unwrap();
        }

        assert_eq!(read, 20);
        assert_eq!(*projection.count.read().await, 20);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let store = store_with(2).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store);
        processor.register(projection.clone());

        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*projection.count.read().await, 2);
        assert_eq!(projection.position().await.events_processed, 2);
    }

    #[tokio::test]
    async fn no_projections_reads_nothing() {
        let processor = ProjectionProcessor::new(store_with(2).await);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
    }
}
