use crate::domain::{
    HandledTransaction, LockedPasswordTransaction, NewTask, RightGuess, RsaKeyPairRecord, SentPasswordTransaction, SignedTransaction, Task,
};
use crate::foundation::{OracleError, Pwtxid, Rqhs, TaskId};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskQueueStats {
    pub total: u64,
    pub pending: u64,
    pub parked: u64,
    pub done: u64,
}

/// Typed record store shared by the dispatcher, the handlers and the scheduler.
///
/// Every method is a complete read-modify-write; callers never hold a store lock across
/// an external call.
pub trait Storage: Send + Sync {
    // --- task queue ---

    /// Persists a task and returns it with its assigned id. Ids increase monotonically.
    fn enqueue_task(&self, task: NewTask) -> Result<Task>;
    fn get_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// Pending tasks with `next_check <= now`, ordered by `next_check` then id. Non-destructive.
    fn due_tasks(&self, now: u64) -> Result<Vec<Task>>;

    /// Marks a task done. Returns `Ok(false)` when it was already done. Unknown ids are an error.
    fn mark_task_done(&self, id: TaskId) -> Result<bool>;

    /// Moves a pending task out of the schedule for good while keeping `done = false`.
    fn park_task(&self, id: TaskId) -> Result<bool>;

    fn pending_tasks(&self) -> Result<Vec<Task>>;
    fn all_tasks(&self) -> Result<Vec<Task>>;

    /// Pending tasks sharing `filter_field`, ordered by id.
    fn pending_tasks_in_group(&self, filter_field: &str) -> Result<Vec<Task>>;

    fn task_stats(&self) -> Result<TaskQueueStats> {
        let mut stats = TaskQueueStats::default();
        for task in self.all_tasks()? {
            stats.total += 1;
            if task.done {
                stats.done += 1;
            } else if task.is_parked() {
                stats.parked += 1;
            } else {
                stats.pending += 1;
            }
        }
        Ok(stats)
    }

    // --- handled conditioned transactions ---

    fn get_handled_transaction(&self, rqhs: &Rqhs) -> Result<Option<HandledTransaction>>;

    /// Raises `max_sigs` for `rqhs`. Returns `Ok(false)` without writing when `sigs` does not exceed the stored value.
    fn record_max_sigs(&self, rqhs: &Rqhs, sigs: u32, now: u64) -> Result<bool>;

    fn signs_for_transaction(&self, rqhs: &Rqhs) -> Result<Option<u32>> {
        Ok(self.get_handled_transaction(rqhs)?.map(|handled| handled.max_sigs))
    }

    // --- locked contracts ---

    /// Stores a locked transaction together with its blind-claim keypair in one atomic write.
    /// Returns `Ok(false)` if the pwtxid is already taken; nothing is written in that case.
    fn insert_locked_transaction(&self, locked: LockedPasswordTransaction, keypair: Option<RsaKeyPairRecord>) -> Result<bool>;
    fn get_locked_transaction(&self, pwtxid: &Pwtxid) -> Result<Option<LockedPasswordTransaction>>;
    fn mark_locked_transaction_done(&self, pwtxid: &Pwtxid) -> Result<bool>;
    fn list_locked_transactions(&self) -> Result<Vec<LockedPasswordTransaction>>;
    fn get_rsa_keypair(&self, pwtxid: &Pwtxid) -> Result<Option<RsaKeyPairRecord>>;

    // --- blind-claim guesses ---

    /// Returns `Ok(false)` when the same (pwtxid, key_hash, message_id) was recorded before.
    fn insert_right_guess(&self, guess: RightGuess) -> Result<bool>;
    fn list_right_guesses(&self, pwtxid: &Pwtxid) -> Result<Vec<RightGuess>>;

    // --- append-only audit ---

    fn insert_signed_transaction(&self, signed: SignedTransaction) -> Result<()>;
    fn list_signed_transactions(&self) -> Result<Vec<SignedTransaction>>;

    /// First signed record written by `task_id`. Point lookup through a task-id index.
    fn signed_transaction_for_task(&self, task_id: TaskId) -> Result<Option<SignedTransaction>>;

    /// Marks the locked transaction of `sent.pwtxid` done and appends `sent` in one atomic write.
    /// Returns `Ok(false)` and writes nothing when it was already done. Unknown pwtxids are an error.
    fn close_with_sent_transaction(&self, sent: SentPasswordTransaction) -> Result<bool>;
    fn list_sent_transactions(&self) -> Result<Vec<SentPasswordTransaction>>;

    fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
