use super::RocksStorage;
use crate::domain::{
    HandledTransaction, LockedPasswordTransaction, NewTask, RightGuess, RsaKeyPairRecord, SentPasswordTransaction, SignedTransaction, Task,
};
use crate::foundation::util::time::now_secs;
use crate::foundation::{OracleError, Pwtxid, Rqhs, TaskId, TASK_PARKED_NEXT_CHECK};
use crate::infrastructure::storage::rocks::schema::*;
use crate::infrastructure::storage::rocks::util::{acquire_with_timeout, decode_u64_be};
use crate::infrastructure::storage::Storage;
use crate::storage_err;
use log::{debug, trace};
use rocksdb::{Direction, IteratorMode, WriteBatch};

impl RocksStorage {
    fn load_task(&self, id: TaskId) -> Result<Task, OracleError> {
        self.get_decoded(CF_TASK, &Self::key_task(id))?.ok_or_else(|| OracleError::KeyNotFound(format!("task id={}", id)))
    }

    fn task_ids_from_index(&self, prefix: &[u8], stop_after: Option<u64>) -> Result<Vec<TaskId>, OracleError> {
        let cf = self.cf_handle(CF_TASK_INDEX)?;
        let mut ids = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, _) = item.map_err(|err| storage_err!("rocksdb iterator task_index", err))?;
            if !key.starts_with(prefix) {
                break;
            }
            let suffix = &key[prefix.len()..];
            if let Some(limit) = stop_after {
                // due:<next_check_be><id_be>
                if suffix.len() != 16 {
                    return Err(storage_err!("task_index decode", "corrupt due key"));
                }
                let next_check = decode_u64_be(&suffix[..8], "task_index decode")?;
                if next_check > limit {
                    break;
                }
                ids.push(decode_u64_be(&suffix[8..], "task_index decode")?);
            } else {
                ids.push(decode_u64_be(suffix, "task_index decode")?);
            }
        }
        Ok(ids)
    }
}

impl Storage for RocksStorage {
    fn enqueue_task(&self, task: NewTask) -> Result<Task, OracleError> {
        let _guard = acquire_with_timeout(&self.task_lock, "enqueue_task")?;
        let id = self.next_sequence(META_TASK_SEQ)?;
        let task = task.into_task(id, now_secs());

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf_handle(CF_METADATA)?, META_TASK_SEQ, id.to_be_bytes());
        batch.put_cf(self.cf_handle(CF_TASK)?, Self::key_task(id), Self::encode(&task)?);
        let index = self.cf_handle(CF_TASK_INDEX)?;
        batch.put_cf(index, Self::key_due(task.next_check, id), b"");
        if let Some(group) = task.filter_field.as_deref() {
            batch.put_cf(index, Self::key_group(group, id), b"");
        }
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write enqueue_task", err))?;
        debug!(
            "task enqueued task_id={} operation={} next_check={} filter_field={:?}",
            id, task.operation, task.next_check, task.filter_field
        );
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, OracleError> {
        trace!("get_task task_id={}", id);
        self.get_decoded(CF_TASK, &Self::key_task(id))
    }

    fn due_tasks(&self, now: u64) -> Result<Vec<Task>, OracleError> {
        let ids = self.task_ids_from_index(b"due:", Some(now))?;
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            let task = self.load_task(id)?;
            if !task.done {
                tasks.push(task);
            }
        }
        trace!("due_tasks now={} count={}", now, tasks.len());
        Ok(tasks)
    }

    fn mark_task_done(&self, id: TaskId) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.task_lock, "mark_task_done")?;
        let mut task = self.load_task(id)?;
        if task.done {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        let index = self.cf_handle(CF_TASK_INDEX)?;
        batch.delete_cf(index, Self::key_due(task.next_check, id));
        if let Some(group) = task.filter_field.as_deref() {
            batch.delete_cf(index, Self::key_group(group, id));
        }
        task.done = true;
        batch.put_cf(self.cf_handle(CF_TASK)?, Self::key_task(id), Self::encode(&task)?);
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write mark_task_done", err))?;
        debug!("task done task_id={} operation={}", id, task.operation);
        Ok(true)
    }

    fn park_task(&self, id: TaskId) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.task_lock, "park_task")?;
        let mut task = self.load_task(id)?;
        if task.done || task.next_check == TASK_PARKED_NEXT_CHECK {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        let index = self.cf_handle(CF_TASK_INDEX)?;
        batch.delete_cf(index, Self::key_due(task.next_check, id));
        batch.put_cf(index, Self::key_due(TASK_PARKED_NEXT_CHECK, id), b"");
        task.next_check = TASK_PARKED_NEXT_CHECK;
        batch.put_cf(self.cf_handle(CF_TASK)?, Self::key_task(id), Self::encode(&task)?);
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write park_task", err))?;
        debug!("task parked task_id={} operation={}", id, task.operation);
        Ok(true)
    }

    fn pending_tasks(&self) -> Result<Vec<Task>, OracleError> {
        Ok(self.all_tasks()?.into_iter().filter(|task| !task.done).collect())
    }

    fn all_tasks(&self) -> Result<Vec<Task>, OracleError> {
        self.scan_prefix(CF_TASK, b"task:")
    }

    fn pending_tasks_in_group(&self, filter_field: &str) -> Result<Vec<Task>, OracleError> {
        let ids = self.task_ids_from_index(&Self::key_group_prefix(filter_field), None)?;
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            let task = self.load_task(id)?;
            if !task.done {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    fn get_handled_transaction(&self, rqhs: &Rqhs) -> Result<Option<HandledTransaction>, OracleError> {
        self.get_decoded(CF_HANDLED, &Self::key_handled(rqhs))
    }

    fn record_max_sigs(&self, rqhs: &Rqhs, sigs: u32, now: u64) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "record_max_sigs")?;
        if let Some(existing) = self.get_handled_transaction(rqhs)? {
            if sigs <= existing.max_sigs {
                trace!("record_max_sigs unchanged rqhs={} stored={} offered={}", rqhs, existing.max_sigs, sigs);
                return Ok(false);
            }
        }
        let record = HandledTransaction { rqhs: *rqhs, max_sigs: sigs, updated_at: now };
        let cf = self.cf_handle(CF_HANDLED)?;
        self.db.put_cf(cf, Self::key_handled(rqhs), Self::encode(&record)?).map_err(|err| storage_err!("rocksdb put_cf handled", err))?;
        debug!("max_sigs raised rqhs={} max_sigs={}", rqhs, sigs);
        Ok(true)
    }

    fn insert_locked_transaction(
        &self,
        locked: LockedPasswordTransaction,
        keypair: Option<RsaKeyPairRecord>,
    ) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "insert_locked_transaction")?;
        let key = Self::key_locked(&locked.pwtxid);
        let cf = self.cf_handle(CF_LOCKED)?;
        if self.db.get_cf(cf, &key).map_err(|err| storage_err!("rocksdb get_cf locked_exists", err))?.is_some() {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        batch.put_cf(cf, key, Self::encode(&locked)?);
        if let Some(keypair) = keypair.as_ref() {
            batch.put_cf(self.cf_handle(CF_RSA)?, Self::key_rsa(&locked.pwtxid), Self::encode(keypair)?);
        }
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write insert_locked_transaction", err))?;
        debug!("locked transaction stored pwtxid={} operation={} with_keypair={}", locked.pwtxid, locked.operation, keypair.is_some());
        Ok(true)
    }

    fn get_locked_transaction(&self, pwtxid: &Pwtxid) -> Result<Option<LockedPasswordTransaction>, OracleError> {
        self.get_decoded(CF_LOCKED, &Self::key_locked(pwtxid))
    }

    fn mark_locked_transaction_done(&self, pwtxid: &Pwtxid) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "mark_locked_transaction_done")?;
        let mut locked = self
            .get_locked_transaction(pwtxid)?
            .ok_or_else(|| OracleError::KeyNotFound(format!("locked transaction pwtxid={}", pwtxid)))?;
        if locked.done {
            return Ok(false);
        }
        locked.done = true;
        let cf = self.cf_handle(CF_LOCKED)?;
        self.db.put_cf(cf, Self::key_locked(pwtxid), Self::encode(&locked)?).map_err(|err| storage_err!("rocksdb put_cf locked", err))?;
        debug!("locked transaction done pwtxid={}", pwtxid);
        Ok(true)
    }

    fn list_locked_transactions(&self) -> Result<Vec<LockedPasswordTransaction>, OracleError> {
        self.scan_prefix(CF_LOCKED, b"pw:")
    }

    fn get_rsa_keypair(&self, pwtxid: &Pwtxid) -> Result<Option<RsaKeyPairRecord>, OracleError> {
        self.get_decoded(CF_RSA, &Self::key_rsa(pwtxid))
    }

    fn insert_right_guess(&self, guess: RightGuess) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "insert_right_guess")?;
        let key = Self::key_guess(&guess.pwtxid, guess.key_hash.as_str(), guess.message_id.as_str());
        let cf = self.cf_handle(CF_GUESS)?;
        if self.db.get_cf(cf, &key).map_err(|err| storage_err!("rocksdb get_cf guess_exists", err))?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, key, Self::encode(&guess)?).map_err(|err| storage_err!("rocksdb put_cf guess", err))?;
        Ok(true)
    }

    fn list_right_guesses(&self, pwtxid: &Pwtxid) -> Result<Vec<RightGuess>, OracleError> {
        self.scan_prefix(CF_GUESS, &Self::key_guess_prefix(pwtxid))
    }

    fn insert_signed_transaction(&self, signed: SignedTransaction) -> Result<(), OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "insert_signed_transaction")?;
        let seq = self.next_sequence(META_SIGNED_SEQ)?;
        let cf = self.cf_handle(CF_SIGNED)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf_handle(CF_METADATA)?, META_SIGNED_SEQ, seq.to_be_bytes());
        batch.put_cf(cf, Self::key_signed(seq), Self::encode(&signed)?);
        if let Some(task_id) = signed.task_id {
            let index_key = Self::key_signed_by_task(task_id);
            if self.db.get_cf(cf, &index_key).map_err(|err| storage_err!("rocksdb get_cf signed_by_task", err))?.is_none() {
                batch.put_cf(cf, index_key, seq.to_be_bytes());
            }
        }
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write insert_signed_transaction", err))
    }

    fn list_signed_transactions(&self) -> Result<Vec<SignedTransaction>, OracleError> {
        self.scan_prefix(CF_SIGNED, b"sig:")
    }

    fn signed_transaction_for_task(&self, task_id: TaskId) -> Result<Option<SignedTransaction>, OracleError> {
        let cf = self.cf_handle(CF_SIGNED)?;
        let Some(seq) = self.db.get_cf(cf, Self::key_signed_by_task(task_id)).map_err(|err| storage_err!("rocksdb get_cf signed_by_task", err))?
        else {
            return Ok(None);
        };
        let seq = decode_u64_be(&seq, "signed_by_task decode")?;
        self.get_decoded(CF_SIGNED, &Self::key_signed(seq))
    }

    fn close_with_sent_transaction(&self, sent: SentPasswordTransaction) -> Result<bool, OracleError> {
        let _guard = acquire_with_timeout(&self.record_lock, "close_with_sent_transaction")?;
        let mut locked = self
            .get_locked_transaction(&sent.pwtxid)?
            .ok_or_else(|| OracleError::KeyNotFound(format!("locked transaction pwtxid={}", sent.pwtxid)))?;
        if locked.done {
            debug!("locked transaction already closed pwtxid={}", sent.pwtxid);
            return Ok(false);
        }
        locked.done = true;
        let seq = self.next_sequence(META_SENT_SEQ)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf_handle(CF_LOCKED)?, Self::key_locked(&sent.pwtxid), Self::encode(&locked)?);
        batch.put_cf(self.cf_handle(CF_METADATA)?, META_SENT_SEQ, seq.to_be_bytes());
        batch.put_cf(self.cf_handle(CF_SENT)?, Self::key_sent(seq), Self::encode(&sent)?);
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write close_with_sent_transaction", err))?;
        debug!("locked transaction closed pwtxid={} kind={:?} sent_seq={}", sent.pwtxid, sent.kind, seq);
        Ok(true)
    }

    fn list_sent_transactions(&self) -> Result<Vec<SentPasswordTransaction>, OracleError> {
        self.scan_prefix(CF_SENT, b"sent:")
    }

    fn health_check(&self) -> Result<(), OracleError> {
        self.schema_version()?.map(|_| ()).ok_or_else(|| storage_err!("health_check", "schema version missing"))
    }
}
