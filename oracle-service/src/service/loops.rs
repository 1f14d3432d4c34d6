//! Long-running service loops. Each loop stops when the shutdown channel flips to `true`.

use crate::service::inbox::poll_inbox;
use crate::service::metrics::Metrics;
use log::{debug, info, warn};
use oracle_core::application::Oracle;
use oracle_core::foundation::util::time::now_secs;
use oracle_core::infrastructure::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Clone, Copy, Debug)]
pub struct LoopIntervals {
    pub scheduler: Duration,
    pub inbox: Duration,
    pub identity: Duration,
    pub status: Duration,
}

pub struct ServiceHandles {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ServiceHandles {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (shutdown, receiver) = watch::channel(false);
        (Self { shutdown, handles: Vec::new() }, receiver)
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals every loop and waits for the current iterations to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!("service loop ended abnormally error={}", err);
            }
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub fn spawn_scheduler_loop(
    oracle: Arc<Oracle>,
    metrics: Arc<Metrics>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("scheduler loop started interval_ms={}", period.as_millis());
        let mut ticker = ticker(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            match oracle.run_due_tasks(now_secs()).await {
                Ok(report) => {
                    metrics.record_tick(&report);
                    if report.dispatched > 0 {
                        debug!(
                            "scheduler tick dispatched={} completed={} pending={} rescheduled={} parked={} failed={}",
                            report.dispatched, report.completed, report.pending, report.rescheduled, report.parked, report.failed
                        );
                    }
                }
                Err(err) => warn!("scheduler tick failed error={}", err),
            }
        }
        info!("scheduler loop stopped");
    })
}

pub fn spawn_inbox_loop(
    oracle: Arc<Oracle>,
    metrics: Arc<Metrics>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("inbox loop started interval_ms={}", period.as_millis());
        let mut ticker = ticker(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            match poll_inbox(&oracle, &metrics).await {
                Ok(report) if report.fetched > 0 => debug!(
                    "inbox polled fetched={} accepted={} dropped={} deferred={}",
                    report.fetched, report.accepted, report.dropped, report.deferred
                ),
                Ok(_) => {}
                Err(err) => warn!("inbox poll failed error={}", err),
            }
        }
        info!("inbox loop stopped");
    })
}

/// Periodic identity broadcast so clients can discover this oracle. The first one goes out at startup.
pub fn spawn_identity_heartbeat(
    oracle: Arc<Oracle>,
    metrics: Arc<Metrics>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("identity heartbeat started interval_secs={}", period.as_secs());
        let mut ticker = ticker(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            let ok = oracle.identity_broadcast().await;
            metrics.record_broadcast("identity", ok);
        }
        info!("identity heartbeat stopped");
    })
}

pub fn spawn_status_reporter(
    metrics: Arc<Metrics>,
    storage: Arc<dyn Storage>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("status reporter started interval_seconds={}", period.as_secs());
        let mut ticker = ticker(period);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            let stats = match storage.task_stats() {
                Ok(stats) => stats,
                Err(err) => {
                    warn!("status report skipped error={}", err);
                    continue;
                }
            };
            let snapshot = metrics.snapshot();
            info!(
                "periodic status report uptime_minutes={} messages_received={} messages_accepted={} messages_dropped={} messages_deferred={} tasks_completed={} tasks_rescheduled={} tasks_parked={} tasks_failed={} broadcasts_ok={} broadcasts_failed={} queue_total={} queue_pending={} queue_parked={} queue_done={}",
                snapshot.uptime.as_secs() / 60,
                snapshot.messages_received,
                snapshot.messages_accepted,
                snapshot.messages_dropped,
                snapshot.messages_deferred,
                snapshot.tasks_completed,
                snapshot.tasks_rescheduled,
                snapshot.tasks_parked,
                snapshot.tasks_failed,
                snapshot.broadcasts_ok,
                snapshot.broadcasts_failed,
                stats.total,
                stats.pending,
                stats.parked,
                stats.done
            );
        }
        info!("status reporter stopped");
    })
}
