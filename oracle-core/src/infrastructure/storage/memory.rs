use crate::domain::{
    HandledTransaction, LockedPasswordTransaction, NewTask, RightGuess, RsaKeyPairRecord, SentPasswordTransaction, SignedTransaction, Task,
};
use crate::foundation::util::time::now_secs;
use crate::foundation::{KeyHash, MessageId, OracleError, Pwtxid, Rqhs, TaskId, TASK_PARKED_NEXT_CHECK};
use crate::infrastructure::storage::Storage;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryInner {
    next_task_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
    // (next_check, id) for pending tasks
    due_index: BTreeSet<(u64, TaskId)>,
    group_index: HashMap<String, BTreeSet<TaskId>>,
    handled: HashMap<Rqhs, HandledTransaction>,
    locked: BTreeMap<Pwtxid, LockedPasswordTransaction>,
    rsa: HashMap<Pwtxid, RsaKeyPairRecord>,
    guess_keys: HashSet<(Pwtxid, KeyHash, MessageId)>,
    guesses: Vec<RightGuess>,
    signed: Vec<SignedTransaction>,
    // task id -> position in `signed`
    signed_by_task: HashMap<TaskId, usize>,
    sent: Vec<SentPasswordTransaction>,
}

impl MemoryInner {
    fn unindex(&mut self, task: &Task) {
        self.due_index.remove(&(task.next_check, task.id));
        if let Some(group) = task.filter_field.as_ref() {
            if let Some(ids) = self.group_index.get_mut(group) {
                ids.remove(&task.id);
                if ids.is_empty() {
                    self.group_index.remove(group);
                }
            }
        }
    }
}

/// In-process record store. Same semantics as `RocksStorage`, nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>, OracleError> {
        self.inner
            .lock()
            .map_err(|_| OracleError::StorageError { operation: "memory storage lock".to_string(), details: "poisoned".to_string() })
    }
}

fn unknown_task(id: TaskId) -> OracleError {
    OracleError::KeyNotFound(format!("task id={}", id))
}

impl Storage for MemoryStorage {
    fn enqueue_task(&self, task: NewTask) -> Result<Task, OracleError> {
        let mut inner = self.lock_inner()?;
        inner.next_task_id += 1;
        let task = task.into_task(inner.next_task_id, now_secs());
        inner.due_index.insert((task.next_check, task.id));
        if let Some(group) = task.filter_field.clone() {
            inner.group_index.entry(group).or_default().insert(task.id);
        }
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, OracleError> {
        Ok(self.lock_inner()?.tasks.get(&id).cloned())
    }

    fn due_tasks(&self, now: u64) -> Result<Vec<Task>, OracleError> {
        let inner = self.lock_inner()?;
        Ok(inner
            .due_index
            .iter()
            .take_while(|(next_check, _)| *next_check <= now)
            .filter_map(|(_, id)| inner.tasks.get(id))
            .filter(|task| !task.done)
            .cloned()
            .collect())
    }

    fn mark_task_done(&self, id: TaskId) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        let task = inner.tasks.get(&id).cloned().ok_or_else(|| unknown_task(id))?;
        if task.done {
            return Ok(false);
        }
        inner.unindex(&task);
        if let Some(stored) = inner.tasks.get_mut(&id) {
            stored.done = true;
        }
        Ok(true)
    }

    fn park_task(&self, id: TaskId) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        let task = inner.tasks.get(&id).cloned().ok_or_else(|| unknown_task(id))?;
        if task.done || task.next_check == TASK_PARKED_NEXT_CHECK {
            return Ok(false);
        }
        inner.due_index.remove(&(task.next_check, id));
        inner.due_index.insert((TASK_PARKED_NEXT_CHECK, id));
        if let Some(stored) = inner.tasks.get_mut(&id) {
            stored.next_check = TASK_PARKED_NEXT_CHECK;
        }
        Ok(true)
    }

    fn pending_tasks(&self) -> Result<Vec<Task>, OracleError> {
        Ok(self.lock_inner()?.tasks.values().filter(|task| !task.done).cloned().collect())
    }

    fn all_tasks(&self) -> Result<Vec<Task>, OracleError> {
        Ok(self.lock_inner()?.tasks.values().cloned().collect())
    }

    fn pending_tasks_in_group(&self, filter_field: &str) -> Result<Vec<Task>, OracleError> {
        let inner = self.lock_inner()?;
        let Some(ids) = inner.group_index.get(filter_field) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| inner.tasks.get(id)).filter(|task| !task.done).cloned().collect())
    }

    fn get_handled_transaction(&self, rqhs: &Rqhs) -> Result<Option<HandledTransaction>, OracleError> {
        Ok(self.lock_inner()?.handled.get(rqhs).cloned())
    }

    fn record_max_sigs(&self, rqhs: &Rqhs, sigs: u32, now: u64) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        if let Some(existing) = inner.handled.get(rqhs) {
            if sigs <= existing.max_sigs {
                return Ok(false);
            }
        }
        inner.handled.insert(*rqhs, HandledTransaction { rqhs: *rqhs, max_sigs: sigs, updated_at: now });
        Ok(true)
    }

    fn insert_locked_transaction(
        &self,
        locked: LockedPasswordTransaction,
        keypair: Option<RsaKeyPairRecord>,
    ) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        if inner.locked.contains_key(&locked.pwtxid) {
            return Ok(false);
        }
        if let Some(keypair) = keypair {
            inner.rsa.insert(locked.pwtxid.clone(), keypair);
        }
        inner.locked.insert(locked.pwtxid.clone(), locked);
        Ok(true)
    }

    fn get_locked_transaction(&self, pwtxid: &Pwtxid) -> Result<Option<LockedPasswordTransaction>, OracleError> {
        Ok(self.lock_inner()?.locked.get(pwtxid).cloned())
    }

    fn mark_locked_transaction_done(&self, pwtxid: &Pwtxid) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        let locked = inner.locked.get_mut(pwtxid).ok_or_else(|| OracleError::KeyNotFound(format!("locked transaction pwtxid={}", pwtxid)))?;
        if locked.done {
            return Ok(false);
        }
        locked.done = true;
        Ok(true)
    }

    fn list_locked_transactions(&self) -> Result<Vec<LockedPasswordTransaction>, OracleError> {
        Ok(self.lock_inner()?.locked.values().cloned().collect())
    }

    fn get_rsa_keypair(&self, pwtxid: &Pwtxid) -> Result<Option<RsaKeyPairRecord>, OracleError> {
        Ok(self.lock_inner()?.rsa.get(pwtxid).cloned())
    }

    fn insert_right_guess(&self, guess: RightGuess) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        if !inner.guess_keys.insert(guess.unique_key()) {
            return Ok(false);
        }
        inner.guesses.push(guess);
        Ok(true)
    }

    fn list_right_guesses(&self, pwtxid: &Pwtxid) -> Result<Vec<RightGuess>, OracleError> {
        Ok(self.lock_inner()?.guesses.iter().filter(|guess| &guess.pwtxid == pwtxid).cloned().collect())
    }

    fn insert_signed_transaction(&self, signed: SignedTransaction) -> Result<(), OracleError> {
        let mut inner = self.lock_inner()?;
        let position = inner.signed.len();
        if let Some(task_id) = signed.task_id {
            inner.signed_by_task.entry(task_id).or_insert(position);
        }
        inner.signed.push(signed);
        Ok(())
    }

    fn list_signed_transactions(&self) -> Result<Vec<SignedTransaction>, OracleError> {
        Ok(self.lock_inner()?.signed.clone())
    }

    fn signed_transaction_for_task(&self, task_id: TaskId) -> Result<Option<SignedTransaction>, OracleError> {
        let inner = self.lock_inner()?;
        Ok(inner.signed_by_task.get(&task_id).and_then(|position| inner.signed.get(*position)).cloned())
    }

    fn close_with_sent_transaction(&self, sent: SentPasswordTransaction) -> Result<bool, OracleError> {
        let mut inner = self.lock_inner()?;
        let locked =
            inner.locked.get_mut(&sent.pwtxid).ok_or_else(|| OracleError::KeyNotFound(format!("locked transaction pwtxid={}", sent.pwtxid)))?;
        if locked.done {
            return Ok(false);
        }
        locked.done = true;
        inner.sent.push(sent);
        Ok(true)
    }

    fn list_sent_transactions(&self) -> Result<Vec<SentPasswordTransaction>, OracleError> {
        Ok(self.lock_inner()?.sent.clone())
    }
}
