//! Background task that runs the delay scan on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use event_store::EventStore;
use lifecycle::LifecycleCoordinator;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns the scan loop. It runs until `shutdown` flips to `true` or its
/// sender is dropped.
///
/// The first scan happens one `interval` after start. A failed scan is
/// logged and the loop keeps going.
pub fn spawn_delay_scanner<S: EventStore + Clone + 'static>(
    coordinator: Arc<LifecycleCoordinator<S>>,
    threshold_minutes: u32,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        tracing::info!(threshold_minutes, ?interval, "delay scanner started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match coordinator.scan_for_delays(threshold_minutes).await {
                        Ok(alerts) if !alerts.is_empty() => {
                            tracing::info!(delayed = alerts.len(), "delay scan flagged orders");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "delay scan failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("delay scanner stopped");
    })
}
