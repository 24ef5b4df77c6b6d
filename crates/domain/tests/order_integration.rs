//! Integration tests for the Order aggregate.
//!
//! These run commands through the service against the in-memory journal and
//! check totals, preparation timing and the single-payment rule, including
//! under concurrent callers.

use std::sync::Arc;

use common::{AggregateId, Clock, ManualClock};
use domain::{
    AddItems, Aggregate, ChangeStatus, DomainError, InMemoryDirectory, ItemRequest, LineItem,
    Money, OrderError, OrderEvent, OrderService, OrderStatus, PaymentMethod, PlaceOrder, Product,
    ProductId, RecordPayment, TableId, price_items,
};
use event_store::{EventStore, InMemoryEventStore, Version};

fn service_with(clock: &ManualClock) -> Arc<OrderService<InMemoryEventStore>> {
    Arc::new(
        OrderService::new(InMemoryEventStore::new())
            .with_clock(Arc::new(clock.clone()))
            .with_max_attempts(64),
    )
}

async fn place(service: &OrderService<InMemoryEventStore>) -> AggregateId {
    let cmd = PlaceOrder::new(Some(TableId::new(5)), None);
    let order_id = cmd.order_id;
    service.place_order(cmd).await.unwrap();
    order_id
}

fn order_error(err: &DomainError) -> &OrderError {
    err.as_order_error().expect("expected an order rule violation")
}

mod order_lifecycle {
    use super::*;

    #[tokio::test]
    async fn soup_and_bread_from_kitchen_to_payment() {
        let clock = ManualClock::starting_now();
        let service = service_with(&clock);

        let catalog = InMemoryDirectory::new();
        for (id, name, cents) in [("soup", "Soup", 500), ("bread", "Bread", 250)] {
            catalog
                .upsert_product(Product {
                    id: ProductId::new(id),
                    name: name.to_string(),
                    price: Money::from_cents(cents),
                })
                .await;
        }

        let order_id = place(&service).await;
        let priced = price_items(
            &catalog,
            &[ItemRequest::new("soup", 2), ItemRequest::new("bread", 1)],
        )
        .await
        .unwrap();
        let result = service
            .add_items(AddItems::new(order_id, priced.lines))
            .await
            .unwrap();
        assert_eq!(result.aggregate.total(), Money::from_cents(1250));

        let started = clock.now();
        let result = service
            .change_status(ChangeStatus::new(order_id, OrderStatus::InPreparation))
            .await
            .unwrap();
        assert_eq!(result.aggregate.status(), OrderStatus::InPreparation);
        assert_eq!(result.aggregate.preparation().started_at, Some(started));

        clock.advance_minutes(14);
        let result = service
            .change_status(ChangeStatus::new(order_id, OrderStatus::Served))
            .await
            .unwrap();
        assert_eq!(result.aggregate.preparation().ended_at, Some(clock.now()));
        assert_eq!(result.aggregate.preparation_minutes(), Some(14.0));

        let result = service
            .record_payment(RecordPayment::new(
                order_id,
                PaymentMethod::Cash,
                Money::from_cents(1250),
            ))
            .await
            .unwrap();
        assert_eq!(result.aggregate.status(), OrderStatus::Paid);
        assert!(result.aggregate.is_fully_covered());

        let err = service
            .record_payment(RecordPayment::new(
                order_id,
                PaymentMethod::Cash,
                Money::from_cents(1250),
            ))
            .await
            .unwrap_err();
        assert_eq!(order_error(&err), &OrderError::DuplicatePayment);
    }

    #[tokio::test]
    async fn catalog_price_changes_do_not_touch_existing_lines() {
        let service = service_with(&ManualClock::starting_now());
        let catalog = InMemoryDirectory::new();
        let tea = Product {
            id: ProductId::new("tea"),
            name: "Tea".to_string(),
            price: Money::from_cents(150),
        };
        catalog.upsert_product(tea.clone()).await;

        let order_id = place(&service).await;
        let priced = price_items(&catalog, &[ItemRequest::new("tea", 2)])
            .await
            .unwrap();
        service
            .add_items(AddItems::new(order_id, priced.lines))
            .await
            .unwrap();

        catalog
            .upsert_product(Product {
                price: Money::from_cents(400),
                ..tea
            })
            .await;

        let order = service.require_order(order_id).await.unwrap();
        assert_eq!(order.items()[0].unit_price, Money::from_cents(150));
        assert_eq!(order.total(), Money::from_cents(300));
    }

    #[tokio::test]
    async fn replay_rebuilds_the_same_order() {
        let clock = ManualClock::starting_now();
        let service = service_with(&clock);
        let order_id = place(&service).await;
        service
            .add_items(AddItems::new(
                order_id,
                vec![LineItem::new("soup", "Soup", 3, Money::from_cents(500))],
            ))
            .await
            .unwrap();
        service
            .change_status(ChangeStatus::new(order_id, OrderStatus::InPreparation))
            .await
            .unwrap();
        clock.advance_minutes(7);
        service
            .change_status(ChangeStatus::new(order_id, OrderStatus::Ready))
            .await
            .unwrap();

        // a clock far in the future must not change what replay produces
        clock.advance_minutes(600);
        let order = service.require_order(order_id).await.unwrap();
        assert_eq!(order.version(), Version::new(4));
        assert_eq!(order.total(), Money::from_cents(1500));
        assert_eq!(order.preparation_minutes(), Some(7.0));
    }
}

mod concurrency {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use event_store::{AppendOptions, EventEnvelope, EventStream};
    use tokio::sync::Barrier;

    /// Journal whose next `armed` loads wait for each other after reading,
    /// so every racer decides against the same order version.
    #[derive(Clone)]
    struct LockstepStore {
        inner: InMemoryEventStore,
        barrier: Arc<Barrier>,
        armed: Arc<AtomicUsize>,
        conflicts: Arc<AtomicUsize>,
    }

    impl LockstepStore {
        fn new(racers: usize) -> Self {
            Self {
                inner: InMemoryEventStore::new(),
                barrier: Arc::new(Barrier::new(racers)),
                armed: Arc::new(AtomicUsize::new(0)),
                conflicts: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn conflicts(&self) -> usize {
            self.conflicts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventStore for LockstepStore {
        async fn append(
            &self,
            events: Vec<EventEnvelope>,
            options: AppendOptions,
        ) -> event_store::Result<Version> {
            let result = self.inner.append(events, options).await;
            if matches!(&result, Err(e) if e.is_conflict()) {
                self.conflicts.fetch_add(1, Ordering::SeqCst);
            }
            result
        }

        async fn get_events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            let events = self.inner.get_events_for_aggregate(aggregate_id).await?;
            if self
                .armed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                self.barrier.wait().await;
            }
            Ok(events)
        }

        async fn get_aggregate_version(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            self.inner.get_aggregate_version(aggregate_id).await
        }

        async fn stream_events_from(&self, position: u64) -> event_store::Result<EventStream> {
            self.inner.stream_events_from(position).await
        }
    }

    /// A placed order on a journal armed for `racers` simultaneous loads.
    async fn racing_setup(
        clock: &ManualClock,
        racers: usize,
    ) -> (Arc<OrderService<LockstepStore>>, AggregateId) {
        let store = LockstepStore::new(racers);
        let service = OrderService::new(store.clone())
            .with_clock(Arc::new(clock.clone()))
            .with_max_attempts(64);

        let cmd = PlaceOrder::new(Some(TableId::new(5)), None);
        let order_id = cmd.order_id;
        service.place_order(cmd).await.unwrap();

        store.armed.store(racers, Ordering::SeqCst);
        (Arc::new(service), order_id)
    }

    #[tokio::test]
    async fn racing_payments_record_exactly_one() {
        let (service, order_id) = racing_setup(&ManualClock::starting_now(), 2).await;

        let mut tasks = Vec::new();
        for method in [PaymentMethod::Cash, PaymentMethod::Card] {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .record_payment(RecordPayment::new(
                        order_id,
                        method,
                        Money::from_cents(1000),
                    ))
                    .await
            }));
        }

        let mut succeeded = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(DomainError::Order(OrderError::DuplicatePayment)) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((succeeded, duplicates), (1, 1));
        assert_eq!(service.handler().store().conflicts(), 1);

        let order = service.require_order(order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);

        let payments = service
            .handler()
            .store()
            .get_events_for_aggregate(order_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == "PaymentRecorded")
            .count();
        assert_eq!(payments, 1);
    }

    #[tokio::test]
    async fn many_racing_payments_still_record_one() {
        let (service, order_id) = racing_setup(&ManualClock::starting_now(), 12).await;

        let mut tasks = Vec::new();
        for i in 0..12 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .record_payment(RecordPayment::new(
                        order_id,
                        PaymentMethod::Qr,
                        Money::from_cents(100 * i),
                    ))
                    .await
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert_eq!(order_error(&err), &OrderError::DuplicatePayment),
            }
        }
        assert_eq!(succeeded, 1);
        assert_eq!(service.handler().store().conflicts(), 11);
    }

    #[tokio::test]
    async fn payment_race_with_no_retries_left_reports_the_conflict() {
        let store = LockstepStore::new(2);
        let service = OrderService::new(store.clone())
            .with_clock(Arc::new(ManualClock::starting_now()))
            .with_max_attempts(1);
        let service = Arc::new(service);
        let cmd = PlaceOrder::new(Some(TableId::new(5)), None);
        let order_id = cmd.order_id;
        service.place_order(cmd).await.unwrap();
        store.armed.store(2, Ordering::SeqCst);

        let mut tasks = Vec::new();
        for method in [PaymentMethod::Cash, PaymentMethod::Card] {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .record_payment(RecordPayment::new(
                        order_id,
                        method,
                        Money::from_cents(1000),
                    ))
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let lost = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(lost.is_conflict());
        assert_eq!(store.conflicts(), 1);
        assert_eq!(
            service.require_order(order_id).await.unwrap().status(),
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn racing_kitchen_starts_stamp_once() {
        let clock = ManualClock::starting_now();
        let (service, order_id) = racing_setup(&clock, 8).await;
        let first_possible_start = clock.now();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let clock = clock.clone();
            tasks.push(tokio::spawn(async move {
                clock.advance(chrono::Duration::seconds(1));
                service
                    .change_status(ChangeStatus::new(order_id, OrderStatus::InPreparation))
                    .await
                    .unwrap()
                    .events
                    .len()
            }));
        }

        let mut recorded = 0;
        for task in tasks {
            recorded += task.await.unwrap();
        }
        assert_eq!(recorded, 1);
        assert_eq!(service.handler().store().conflicts(), 7);

        let events = service
            .handler()
            .store()
            .get_events_for_aggregate(order_id)
            .await
            .unwrap();
        let starts: Vec<_> = events
            .iter()
            .filter_map(|e| match e.decode::<OrderEvent>().unwrap() {
                OrderEvent::StatusChanged(data) => data.preparation.started_at,
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 1);
        assert!(starts[0] > first_possible_start);

        let order = service.require_order(order_id).await.unwrap();
        assert_eq!(order.preparation().started_at, Some(starts[0]));
    }

    #[tokio::test]
    async fn items_added_concurrently_are_all_kept() {
        let (service, order_id) = racing_setup(&ManualClock::starting_now(), 10).await;

        let mut tasks = Vec::new();
        for i in 1..=10 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .add_items(AddItems::new(
                        order_id,
                        vec![LineItem::new(
                            format!("dish-{i}"),
                            "Dish",
                            1,
                            Money::from_cents(100),
                        )],
                    ))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(service.handler().store().conflicts() >= 9);
        let order = service.require_order(order_id).await.unwrap();
        assert_eq!(order.item_count(), 10);
        assert_eq!(order.total(), Money::from_cents(1000));
    }
}
