use crate::application::context::OracleContext;
use crate::application::dispatcher::{dispatch_request, dispatch_task, filter_tasks, RequestOutcome, TaskOutcome};
use crate::application::scheduler::{Scheduler, TickReport};
use crate::domain::protocol::{subjects, IdentityMessage};
use crate::domain::{InboundMessage, LockedPasswordTransaction, Task};
use crate::foundation::Result;
use crate::infrastructure::storage::TaskQueueStats;
use serde::Serialize;

/// Diagnostics view of the queue and the open contracts.
#[derive(Clone, Debug, Serialize)]
pub struct OracleSnapshot {
    pub stats: TaskQueueStats,
    pub pending_tasks: Vec<Task>,
    pub locked_transactions: Vec<LockedPasswordTransaction>,
}

/// Engine facade used by the service loops and the tests.
pub struct Oracle {
    ctx: OracleContext,
    scheduler: Scheduler,
}

impl Oracle {
    pub fn new(ctx: OracleContext, workers: usize) -> Self {
        let scheduler = Scheduler::new(ctx.clone(), workers);
        Self { ctx, scheduler }
    }

    pub fn context(&self) -> &OracleContext {
        &self.ctx
    }

    pub async fn handle_message(&self, message: &InboundMessage) -> Result<RequestOutcome> {
        dispatch_request(&self.ctx, message).await
    }

    /// Runnable tasks at `now`: due, and one survivor per filter group.
    pub fn tasks(&self, now: u64) -> Result<Vec<Task>> {
        self.scheduler.runnable_tasks(now)
    }

    pub fn filter_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>> {
        filter_tasks(self.ctx.storage.as_ref(), tasks)
    }

    /// Runs a single task without the scheduler's error policy.
    pub async fn handle_task(&self, task: &Task) -> Result<TaskOutcome> {
        dispatch_task(&self.ctx, task).await
    }

    pub async fn run_due_tasks(&self, now: u64) -> Result<TickReport> {
        self.scheduler.run_once(now).await
    }

    pub async fn identity_broadcast(&self) -> bool {
        self.ctx.broadcast_json(subjects::IDENTITY_BROADCAST, &IdentityMessage::default()).await
    }

    pub fn snapshot(&self) -> Result<OracleSnapshot> {
        let storage = self.ctx.storage.as_ref();
        Ok(OracleSnapshot {
            stats: storage.task_stats()?,
            pending_tasks: storage.pending_tasks()?,
            locked_transactions: storage.list_locked_transactions()?,
        })
    }
}
