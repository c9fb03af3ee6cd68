//! Single-writer sync runtime.
//!
//! Change events arrive concurrently from three independent streams. This
//! module serializes them through one bounded channel into a dedicated
//! worker thread that owns the reconciler: bursts are drained into one
//! batch, applied, and settled as a single recomputation pass. Dropping
//! the runtime closes the queue; the worker drains what is left, finishes
//! its final pass, and is joined, so a partially computed view is never
//! left published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::error::{MusterError, MusterResult, RuntimeError};
use crate::event::ChangeEvent;
use crate::facade::QueryFacade;
use crate::reconciler::Reconciler;
use crate::request::{DistressCall, DistressRequest};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct SyncRuntimeConfig {
    /// Max queued messages before backpressure applies.
    pub queue_capacity: usize,
    /// How long the worker waits for a burst to go quiet before settling
    /// the batch.
    pub settle_window: Duration,
    /// Upper bound on events settled in one batch.
    pub max_batch: usize,
}

impl Default for SyncRuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4096,
            settle_window: Duration::from_millis(25),
            max_batch: 1024,
        }
    }
}

enum Msg {
    Event(ChangeEvent),
    Originate {
        call: DistressCall,
        reply: Sender<MusterResult<DistressRequest>>,
    },
    Flush {
        reply: Sender<()>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

/// Serialized front door for the reconciler.
///
/// Producers on any thread submit events or originate distress requests;
/// one named worker thread applies everything in order. Reads go through
/// the [`QueryFacade`] and never touch the worker.
pub struct SyncRuntime {
    tx: Option<Sender<Msg>>,
    queue_capacity: usize,
    facade: QueryFacade,
    reconciler: Arc<Reconciler>,
    rejected_events: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl SyncRuntime {
    /// Starts the worker thread around the given reconciler.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread.
    #[must_use]
    pub fn start(reconciler: Reconciler, config: SyncRuntimeConfig) -> Self {
        let queue_capacity = config.queue_capacity.max(1);
        let settle_window = config.settle_window;
        let max_batch = config.max_batch.max(1);

        let reconciler = Arc::new(reconciler);
        let facade = reconciler.facade();
        let rejected_events = Arc::new(AtomicU64::new(0));

        let (tx, rx) = bounded::<Msg>(queue_capacity);

        let worker_core = Arc::clone(&reconciler);
        let worker_rejected = Arc::clone(&rejected_events);
        let join = thread::Builder::new()
            .name("muster-sync".to_string())
            .spawn(move || worker_loop(&worker_core, &rx, settle_window, max_batch, &worker_rejected))
            .expect("failed to spawn muster sync worker");

        Self {
            tx: Some(tx),
            queue_capacity,
            facade,
            reconciler,
            rejected_events,
            join: Some(join),
        }
    }

    /// Starts a runtime over fresh in-memory stores with default config.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::start(Reconciler::in_memory(), SyncRuntimeConfig::default())
    }

    fn sender(&self) -> Result<&Sender<Msg>, RuntimeError> {
        self.tx.as_ref().ok_or(RuntimeError::Disconnected)
    }

    /// Queues a change event without blocking.
    ///
    /// # Errors
    ///
    /// `QueueFull` under backpressure, `Disconnected` after shutdown.
    pub fn try_submit(&self, event: ChangeEvent) -> MusterResult<()> {
        match self.sender()?.try_send(Msg::Event(event)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RuntimeError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(RuntimeError::Disconnected.into()),
        }
    }

    /// Queues a change event, blocking while the queue is full.
    pub fn submit(&self, event: ChangeEvent) -> MusterResult<()> {
        self.sender()?
            .send(Msg::Event(event))
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))
    }

    /// Originates a distress request through the worker and waits for the
    /// provisional record.
    pub fn originate_distress(&self, call: DistressCall) -> MusterResult<DistressRequest> {
        let (reply_tx, reply_rx) = bounded(1);
        self.sender()?
            .send(Msg::Originate {
                call,
                reply: reply_tx,
            })
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))?;
        reply_rx
            .recv()
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))?
    }

    /// Blocks until everything queued before this call has been applied
    /// and published. Useful for deterministic reads and tests.
    pub fn flush(&self) -> MusterResult<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.sender()?
            .send(Msg::Flush { reply: reply_tx })
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))?;
        reply_rx
            .recv()
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))
    }

    /// A read handle onto the published view.
    #[must_use]
    pub fn facade(&self) -> QueryFacade {
        self.facade.clone()
    }

    /// Number of derived-view publishes so far (one per settled batch).
    #[must_use]
    pub fn recompute_passes(&self) -> u64 {
        self.reconciler.recompute_passes()
    }

    /// Cumulative count of events rejected as malformed.
    #[must_use]
    pub fn rejected_events(&self) -> u64 {
        self.rejected_events.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn submit_sleep(&self, duration: Duration) -> MusterResult<Receiver<()>> {
        let (reply_tx, reply_rx) = bounded(1);
        self.sender()?
            .send(Msg::Sleep {
                duration,
                reply: reply_tx,
            })
            .map_err(|_| MusterError::from(RuntimeError::Disconnected))?;
        Ok(reply_rx)
    }
}

impl Drop for SyncRuntime {
    fn drop(&mut self) {
        // Close the queue: the worker drains what is queued, settles its
        // final batch, then exits.
        drop(self.tx.take());
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    reconciler: &Reconciler,
    rx: &Receiver<Msg>,
    settle_window: Duration,
    max_batch: usize,
    rejected_events: &AtomicU64,
) {
    info!("sync worker started");

    let mut carried: Option<Msg> = None;
    loop {
        let msg = match carried.take() {
            Some(msg) => msg,
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };

        match msg {
            Msg::Event(first) => {
                let mut batch = vec![first];

                // Drain the burst until the queue goes quiet; a non-event
                // message ends the batch and is handled afterwards.
                while batch.len() < max_batch {
                    match rx.recv_timeout(settle_window) {
                        Ok(Msg::Event(event)) => batch.push(event),
                        Ok(other) => {
                            carried = Some(other);
                            break;
                        }
                        Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
                    }
                }

                match reconciler.apply_batch(&batch) {
                    Ok(report) => {
                        rejected_events.fetch_add(report.rejected as u64, Ordering::Relaxed);
                        debug!(
                            batch = batch.len(),
                            applied = report.applied,
                            stale = report.stale,
                            rejected = report.rejected,
                            "settled change batch"
                        );
                    }
                    Err(err) => warn!(error = %err, "failed to settle change batch"),
                }
            }

            Msg::Originate { call, reply } => {
                let _ = reply.send(reconciler.originate_distress(call));
            }

            Msg::Flush { reply } => {
                // Everything queued before the flush was already applied;
                // publish anything still pending and acknowledge.
                if let Err(err) = reconciler.republish() {
                    warn!(error = %err, "failed to republish on flush");
                }
                let _ = reply.send(());
            }

            #[cfg(test)]
            Msg::Sleep { duration, reply } => {
                thread::sleep(duration);
                let _ = reply.send(());
            }
        }
    }

    info!("sync worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use uuid::Uuid;

    use crate::event::EntityKind;
    use crate::geo::GeoPoint;
    use crate::request::EmergencyType;

    fn alert_event(sequence: u64, probability: f64) -> ChangeEvent {
        ChangeEvent::upsert(
            EntityKind::Alert,
            sequence,
            json!({
                "id": Uuid::new_v4(),
                "disaster_type": "flood",
                "severity": "High",
                "probability": probability,
                "position": { "lat": 10.0, "lon": 20.0 },
                "status": "Active",
            }),
        )
    }

    #[test]
    fn burst_settles_into_few_recompute_passes() {
        let runtime = SyncRuntime::start(
            Reconciler::in_memory(),
            SyncRuntimeConfig {
                queue_capacity: 1024,
                settle_window: Duration::from_millis(50),
                max_batch: 1024,
            },
        );

        for i in 0..100 {
            runtime.submit(alert_event(1, f64::from(i))).unwrap();
        }
        runtime.flush().unwrap();

        let view = runtime.facade().snapshot().unwrap();
        assert_eq!(view.alerts.len(), 100);
        assert_eq!(view.triage.alert_count, 100);

        let passes = runtime.recompute_passes();
        assert!(passes >= 1, "at least one pass must have run");
        assert!(passes <= 10, "a burst must coalesce, got {passes} passes");
    }

    #[test]
    fn drop_drains_queued_events_before_the_worker_exits() {
        let runtime = SyncRuntime::in_memory();
        let facade = runtime.facade();

        for _ in 0..20 {
            runtime.submit(alert_event(1, 50.0)).unwrap();
        }
        drop(runtime);

        assert_eq!(facade.snapshot().unwrap().alerts.len(), 20);
    }

    #[test]
    fn try_submit_reports_backpressure() {
        let runtime = SyncRuntime::start(
            Reconciler::in_memory(),
            SyncRuntimeConfig {
                queue_capacity: 1,
                settle_window: Duration::from_millis(1),
                max_batch: 16,
            },
        );

        // Occupy the worker, then fill the single queue slot.
        let sleeping = runtime.submit_sleep(Duration::from_millis(200)).unwrap();
        runtime.submit(alert_event(1, 10.0)).unwrap();

        let err = runtime.try_submit(alert_event(1, 20.0)).unwrap_err();
        assert!(matches!(
            err,
            MusterError::Runtime(RuntimeError::QueueFull { capacity: 1 })
        ));

        sleeping.recv().unwrap();
    }

    #[test]
    fn originate_round_trips_through_the_worker() {
        let runtime = SyncRuntime::in_memory();

        let request = runtime
            .originate_distress(DistressCall {
                requester: "G".to_string(),
                contact: "112".to_string(),
                emergency: EmergencyType::Injured,
                people_count: 1,
                position: GeoPoint::new(0.0, 0.0).unwrap(),
                description: None,
            })
            .unwrap();

        let view = runtime.facade().snapshot().unwrap();
        assert_eq!(view.requests.len(), 1);
        assert_eq!(view.requests[0].id, request.id);

        let invalid = runtime.originate_distress(DistressCall {
            requester: String::new(),
            contact: "112".to_string(),
            emergency: EmergencyType::Other,
            people_count: 1,
            position: GeoPoint::new(0.0, 0.0).unwrap(),
            description: None,
        });
        assert!(invalid.is_err());
    }

    #[test]
    fn rejected_events_are_counted_and_do_not_stop_the_stream() {
        let runtime = SyncRuntime::in_memory();

        runtime
            .submit(ChangeEvent::upsert(
                EntityKind::Alert,
                1,
                json!({ "id": Uuid::new_v4() }),
            ))
            .unwrap();
        runtime.submit(alert_event(1, 60.0)).unwrap();
        runtime.flush().unwrap();

        assert_eq!(runtime.rejected_events(), 1);
        assert_eq!(runtime.facade().snapshot().unwrap().alerts.len(), 1);
    }

    #[test]
    fn submit_after_shutdown_reports_disconnected() {
        let runtime = SyncRuntime::in_memory();
        let mut moved = runtime;
        // Simulate a consumer holding the handle across shutdown by taking
        // the sender out manually.
        moved.tx = None;
        assert!(matches!(
            moved.submit(alert_event(1, 10.0)).unwrap_err(),
            MusterError::Runtime(RuntimeError::Disconnected)
        ));
    }
}
