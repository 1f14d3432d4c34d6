//! Executes due tasks on a bounded pool.

use crate::application::context::OracleContext;
use crate::application::dispatcher::{dispatch_task, filter_tasks, TaskOutcome};
use crate::domain::Task;
use crate::foundation::{OracleError, Result, TaskId};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub dispatched: usize,
    pub completed: usize,
    pub pending: usize,
    pub rescheduled: usize,
    pub parked: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, run: TaskRun) {
        match run {
            TaskRun::Finished(TaskOutcome::Completed) => self.completed += 1,
            TaskRun::Finished(TaskOutcome::Pending) => self.pending += 1,
            TaskRun::Finished(TaskOutcome::Rescheduled { .. }) => self.rescheduled += 1,
            TaskRun::Finished(TaskOutcome::Parked) => self.parked += 1,
            TaskRun::Failed => self.failed += 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskRun {
    Finished(TaskOutcome),
    /// Left pending after an error; retried on a later tick.
    Failed,
}

/// Runs one task and applies the error policy: invariant violations park the task, anything
/// else leaves it pending.
pub async fn execute(ctx: &OracleContext, task: &Task) -> TaskRun {
    match dispatch_task(ctx, task).await {
        Ok(outcome) => {
            debug!("task finished id={} operation={} outcome={:?}", task.id, task.operation, outcome);
            TaskRun::Finished(outcome)
        }
        Err(err @ OracleError::InvariantViolation { .. }) => {
            error!("task parked on invariant violation id={} operation={} error={}", task.id, task.operation, err);
            match ctx.storage.park_task(task.id) {
                Ok(_) => TaskRun::Finished(TaskOutcome::Parked),
                Err(park_err) => {
                    error!("parking task failed id={} error={}", task.id, park_err);
                    TaskRun::Failed
                }
            }
        }
        Err(err) => {
            warn!("task failed, left pending id={} operation={} transient={} error={}", task.id, task.operation, err.is_transient(), err);
            TaskRun::Failed
        }
    }
}

struct InFlightGuard {
    set: Arc<Mutex<HashSet<TaskId>>>,
    id: TaskId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

pub struct Scheduler {
    ctx: OracleContext,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<TaskId>>>,
}

impl Scheduler {
    pub fn new(ctx: OracleContext, workers: usize) -> Self {
        Self { ctx, permits: Arc::new(Semaphore::new(workers.max(1))), in_flight: Arc::new(Mutex::new(HashSet::new())) }
    }

    /// Due tasks after group filtering, in `next_check` then id order.
    pub fn runnable_tasks(&self, now: u64) -> Result<Vec<Task>> {
        let storage = self.ctx.storage.as_ref();
        filter_tasks(storage, storage.due_tasks(now)?)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Dispatches every runnable task not already running and waits for them.
    pub async fn run_once(&self, now: u64) -> Result<TickReport> {
        let mut report = TickReport::default();
        let mut running = JoinSet::new();
        for task in self.runnable_tasks(now)? {
            if !self.in_flight.lock().insert(task.id) {
                debug!("task still in flight id={}", task.id);
                continue;
            }
            let guard = InFlightGuard { set: self.in_flight.clone(), id: task.id };
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|err| OracleError::Message(format!("scheduler pool closed: {}", err)))?;
            let ctx = self.ctx.clone();
            report.dispatched += 1;
            running.spawn(async move {
                let _guard = guard;
                let _permit = permit;
                execute(&ctx, &task).await
            });
        }
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok(run) => report.record(run),
                Err(err) => {
                    error!("task worker aborted error={}", err);
                    report.failed += 1;
                }
            }
        }
        if report.dispatched > 0 {
            debug!("scheduler tick done now={} report={:?}", now, report);
        }
        Ok(report)
    }
}
