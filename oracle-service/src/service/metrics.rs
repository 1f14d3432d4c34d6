use log::debug;
use oracle_core::application::{DropReason, RequestOutcome, TickReport};
use oracle_core::foundation::OracleError;
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub messages_received: u64,
    pub messages_accepted: u64,
    pub messages_dropped: u64,
    pub messages_deferred: u64,
    pub tasks_completed: u64,
    pub tasks_pending: u64,
    pub tasks_rescheduled: u64,
    pub tasks_parked: u64,
    pub tasks_failed: u64,
    pub broadcasts_ok: u64,
    pub broadcasts_failed: u64,
}

pub struct Metrics {
    registry: Registry,
    messages_total: IntCounterVec,
    drops_total: IntCounterVec,
    tasks_total: IntCounterVec,
    broadcasts_total: IntCounterVec,
    scheduler_ticks_total: IntCounter,
    started_at: Instant,
    messages_received: AtomicU64,
    messages_accepted: AtomicU64,
    messages_dropped: AtomicU64,
    messages_deferred: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_pending: AtomicU64,
    tasks_rescheduled: AtomicU64,
    tasks_parked: AtomicU64,
    tasks_failed: AtomicU64,
    broadcasts_ok: AtomicU64,
    broadcasts_failed: AtomicU64,
}

fn metrics_err(err: prometheus::Error) -> OracleError {
    OracleError::Message(err.to_string())
}

/// Stable label for a drop reason; the free-form details stay in the logs.
pub fn drop_reason_label(reason: &DropReason) -> &'static str {
    match reason {
        DropReason::Malformed(_) => "malformed",
        DropReason::UnknownOperation(_) => "unknown_operation",
        DropReason::MissingField(_) => "missing_field",
        DropReason::Invalid(_) => "invalid",
        DropReason::Superseded => "superseded",
        DropReason::Duplicate => "duplicate",
        DropReason::UnknownContract => "unknown_contract",
        DropReason::NoValidGuess => "no_valid_guess",
    }
}

impl Metrics {
    pub fn new() -> Result<Self, OracleError> {
        debug!("initializing prometheus metrics");
        let registry = Registry::new();
        let messages_total =
            IntCounterVec::new(prometheus::Opts::new("oracle_messages_total", "Inbound messages by outcome"), &["outcome"])
                .map_err(metrics_err)?;
        let drops_total =
            IntCounterVec::new(prometheus::Opts::new("oracle_message_drops_total", "Dropped messages by reason"), &["reason"])
                .map_err(metrics_err)?;
        let tasks_total =
            IntCounterVec::new(prometheus::Opts::new("oracle_tasks_total", "Task executions by outcome"), &["outcome"])
                .map_err(metrics_err)?;
        let broadcasts_total =
            IntCounterVec::new(prometheus::Opts::new("oracle_broadcasts_total", "Outbound broadcasts by kind and status"), &["kind", "status"])
                .map_err(metrics_err)?;
        let scheduler_ticks_total =
            IntCounter::new("oracle_scheduler_ticks_total", "Scheduler ticks that ran at least one task").map_err(metrics_err)?;

        registry.register(Box::new(messages_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(drops_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(tasks_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(broadcasts_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(scheduler_ticks_total.clone())).map_err(metrics_err)?;

        Ok(Self {
            registry,
            messages_total,
            drops_total,
            tasks_total,
            broadcasts_total,
            scheduler_ticks_total,
            started_at: Instant::now(),
            messages_received: AtomicU64::new(0),
            messages_accepted: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            messages_deferred: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_pending: AtomicU64::new(0),
            tasks_rescheduled: AtomicU64::new(0),
            tasks_parked: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            broadcasts_ok: AtomicU64::new(0),
            broadcasts_failed: AtomicU64::new(0),
        })
    }

    pub fn record_request_outcome(&self, outcome: &RequestOutcome) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        match outcome {
            RequestOutcome::Accepted { .. } => {
                self.messages_total.with_label_values(&["accepted"]).inc();
                self.messages_accepted.fetch_add(1, Ordering::Relaxed);
            }
            RequestOutcome::Dropped(reason) => {
                self.messages_total.with_label_values(&["dropped"]).inc();
                self.drops_total.with_label_values(&[drop_reason_label(reason)]).inc();
                self.messages_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// A message left in the inbox after a transient failure.
    pub fn record_request_deferred(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.messages_total.with_label_values(&["deferred"]).inc();
        self.messages_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self, report: &TickReport) {
        if report.dispatched == 0 {
            return;
        }
        self.scheduler_ticks_total.inc();
        let outcomes = [
            ("completed", report.completed, &self.tasks_completed),
            ("pending", report.pending, &self.tasks_pending),
            ("rescheduled", report.rescheduled, &self.tasks_rescheduled),
            ("parked", report.parked, &self.tasks_parked),
            ("failed", report.failed, &self.tasks_failed),
        ];
        for (label, count, mirror) in outcomes {
            if count > 0 {
                self.tasks_total.with_label_values(&[label]).inc_by(count as u64);
                mirror.fetch_add(count as u64, Ordering::Relaxed);
            }
        }
    }

    pub fn record_broadcast(&self, kind: &str, ok: bool) {
        if ok {
            self.broadcasts_total.with_label_values(&[kind, "ok"]).inc();
            self.broadcasts_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.broadcasts_total.with_label_values(&[kind, "error"]).inc();
            self.broadcasts_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.started_at.elapsed(),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_deferred: self.messages_deferred.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_pending: self.tasks_pending.load(Ordering::Relaxed),
            tasks_rescheduled: self.tasks_rescheduled.load(Ordering::Relaxed),
            tasks_parked: self.tasks_parked.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            broadcasts_ok: self.broadcasts_ok.load(Ordering::Relaxed),
            broadcasts_failed: self.broadcasts_failed.load(Ordering::Relaxed),
        }
    }

    pub fn encode(&self) -> Result<String, OracleError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer).map_err(metrics_err)?;
        let output = String::from_utf8(buffer).map_err(|err| OracleError::Message(err.to_string()))?;
        Ok(output)
    }
}
