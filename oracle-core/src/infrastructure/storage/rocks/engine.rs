//! RocksDB-backed storage engine.
//!
//! # Lock Semantics
//!
//! RocksDB itself is thread-safe, but read-then-write sequences need coarse-grained mutexes
//! to stay consistent.
//!
//! - `task_lock`: guards the task sequence, task records and the due/group indexes.
//! - `record_lock`: guards handled counts, locked contracts, keypairs, guesses and the audit sequences.
//!
//! Locks are acquired with a bounded timeout (`STORAGE_LOCK_TIMEOUT_SECS`). No method takes
//! both locks.
//!
//! # Column Families
//!
//! See `schema.rs` for column family names and key prefixes.

use crate::domain::SignedTransaction;
use crate::foundation::{OracleError, Pwtxid, Rqhs, TaskId, ORACLE_DATA_DIR_ENV};
use crate::infrastructure::storage::rocks::migration::open_db_with_cfs;
use crate::infrastructure::storage::rocks::schema::*;
use crate::infrastructure::storage::rocks::util::decode_u64_be;
use crate::storage_err;
use bincode::Options;
use log::{debug, info, warn};
use rocksdb::{checkpoint::Checkpoint, ColumnFamily, Direction, IteratorMode, WriteBatch, DB};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::{env, fs};

mod storage;

const STORE_DIR_NAME: &str = "oracle-store";
const SCHEMA_VERSION: u32 = 2;

pub struct RocksStorage {
    db: Arc<DB>,
    task_lock: std::sync::Mutex<()>,
    record_lock: std::sync::Mutex<()>,
}

impl RocksStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        Self::open_with_options(path, false)
    }

    pub fn open_with_options(path: impl AsRef<Path>, allow_schema_wipe: bool) -> Result<Self, OracleError> {
        let path = path.as_ref();
        debug!("opening RocksStorage path={}", path.display());
        let db = open_db_with_cfs(path)?;
        let storage = Self { db: Arc::new(db), task_lock: std::sync::Mutex::new(()), record_lock: std::sync::Mutex::new(()) };
        if let Err(err) = storage.maybe_run_migrations() {
            if allow_schema_wipe {
                if let OracleError::SchemaMismatch { stored, current } = err {
                    warn!("schema mismatch (stored={}, current={}); wiping db path={}", stored, current, path.display());
                    drop(storage);
                    if path.exists() {
                        fs::remove_dir_all(path).map_err(|err| storage_err!("fs::remove_dir_all schema_wipe", err))?;
                    }
                    return Self::open_with_options(path, false);
                }
            }
            return Err(err);
        }
        info!("RocksStorage opened path={}", path.display());
        Ok(storage)
    }

    pub fn open_default() -> Result<Self, OracleError> {
        if let Ok(data_dir) = env::var(ORACLE_DATA_DIR_ENV) {
            let trimmed = data_dir.trim();
            if !trimmed.is_empty() {
                let dir = Path::new(trimmed);
                fs::create_dir_all(dir).map_err(|err| storage_err!("fs::create_dir_all oracle_data_dir", err))?;
                let path = dir.join(STORE_DIR_NAME);
                debug!("opening RocksStorage ({}) path={}", ORACLE_DATA_DIR_ENV, path.display());
                return Self::open_with_options(path, false);
            }
        }
        let base = env::current_dir().map_err(|err| storage_err!("env::current_dir", err))?;
        let dir = base.join(".oracle");
        fs::create_dir_all(&dir).map_err(|err| storage_err!("fs::create_dir_all default_dir", err))?;
        let path = dir.join(STORE_DIR_NAME);
        debug!("opening RocksStorage (default dir) path={}", path.display());
        Self::open_with_options(path, false)
    }

    pub fn open_in_dir(data_dir: impl AsRef<Path>) -> Result<Self, OracleError> {
        Self::open_in_dir_with_options(data_dir, false)
    }

    pub fn open_in_dir_with_options(data_dir: impl AsRef<Path>, allow_schema_wipe: bool) -> Result<Self, OracleError> {
        let dir = data_dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Self::open_default();
        }
        fs::create_dir_all(dir).map_err(|err| storage_err!("fs::create_dir_all open_in_dir", err))?;
        let path = dir.join(STORE_DIR_NAME);
        debug!("opening RocksStorage in dir path={}", path.display());
        Self::open_with_options(path, allow_schema_wipe)
    }

    pub fn create_checkpoint(&self, path: impl AsRef<Path>) -> Result<(), OracleError> {
        let path = path.as_ref();
        info!("creating RocksStorage checkpoint path={}", path.display());
        if path.exists() {
            let mut entries = fs::read_dir(path).map_err(|err| storage_err!("fs::read_dir checkpoint", err))?;
            if entries.next().is_some() {
                return Err(OracleError::StorageError {
                    operation: "rocksdb checkpoint".to_string(),
                    details: format!("checkpoint directory is not empty: {}", path.display()),
                });
            }
            fs::remove_dir_all(path).map_err(|err| storage_err!("fs::remove_dir_all checkpoint", err))?;
        }
        let checkpoint = Checkpoint::new(&self.db).map_err(|err| storage_err!("rocksdb::Checkpoint::new", err))?;
        checkpoint.create_checkpoint(path).map_err(|err| storage_err!("rocksdb::create_checkpoint", err))?;
        info!("checkpoint created path={}", path.display());
        Ok(())
    }

    pub fn compact(&self) -> Result<(), OracleError> {
        debug!("rocksdb compact_range start");
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        debug!("rocksdb compact_range complete");
        Ok(())
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily, OracleError> {
        self.db.cf_handle(name).ok_or_else(|| OracleError::StorageError {
            operation: "rocksdb cf_handle".to_string(),
            details: format!("missing column family: {}", name),
        })
    }

    fn maybe_run_migrations(&self) -> Result<(), OracleError> {
        match self.schema_version()? {
            None => {
                info!("initializing fresh db schema schema_version={}", SCHEMA_VERSION);
                self.set_schema_version(SCHEMA_VERSION)?;
            }
            Some(v) if v == SCHEMA_VERSION => {}
            Some(1) => {
                let indexed = self.index_signed_by_task()?;
                info!("migrated db schema from_version=1 to_version={} signed_indexed={}", SCHEMA_VERSION, indexed);
                self.set_schema_version(SCHEMA_VERSION)?;
            }
            Some(v) => return Err(OracleError::SchemaMismatch { stored: v, current: SCHEMA_VERSION }),
        }
        Ok(())
    }

    /// Builds the `tsig:` task-id index over signed records written before it existed.
    fn index_signed_by_task(&self) -> Result<usize, OracleError> {
        let cf = self.cf_handle(CF_SIGNED)?;
        let mut batch = WriteBatch::default();
        let mut seen = HashSet::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(b"sig:", Direction::Forward)) {
            let (key, value) = item.map_err(|err| storage_err!("rocksdb iterator signed", err))?;
            if !key.starts_with(b"sig:") {
                break;
            }
            let signed: SignedTransaction = Self::decode(&value)?;
            if let Some(task_id) = signed.task_id.filter(|task_id| seen.insert(*task_id)) {
                batch.put_cf(cf, Self::key_signed_by_task(task_id), &key[4..]);
            }
        }
        let indexed = seen.len();
        self.db.write(batch).map_err(|err| storage_err!("rocksdb write index_signed_by_task", err))?;
        Ok(indexed)
    }

    fn schema_version(&self) -> Result<Option<u32>, OracleError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, META_SCHEMA_VERSION) {
            Ok(Some(bytes)) => {
                let array: [u8; 4] = bytes.as_slice().try_into().map_err(|_| OracleError::StorageError {
                    operation: "schema_version decode".to_string(),
                    details: "corrupt schema version".to_string(),
                })?;
                Ok(Some(u32::from_be_bytes(array)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err!("rocksdb get_cf schema_version", e)),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), OracleError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db.put_cf(cf, META_SCHEMA_VERSION, version.to_be_bytes()).map_err(OracleError::from)
    }

    /// Reads a metadata counter and returns the next value. Callers hold the matching lock and
    /// persist the returned value in the same batch as the record it numbers.
    fn next_sequence(&self, key: &[u8]) -> Result<u64, OracleError> {
        let cf = self.cf_handle(CF_METADATA)?;
        let current = match self.db.get_cf(cf, key).map_err(|err| storage_err!("rocksdb get_cf sequence", err))? {
            Some(bytes) => decode_u64_be(&bytes, "sequence decode")?,
            None => 0,
        };
        current.checked_add(1).ok_or_else(|| storage_err!("sequence", "sequence exhausted"))
    }

    fn get_decoded<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>, OracleError> {
        let cf = self.cf_handle(cf_name)?;
        match self.db.get_cf(cf, key).map_err(|err| storage_err!("rocksdb get_cf", err))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_prefix<T: serde::de::DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>, OracleError> {
        let cf = self.cf_handle(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|err| storage_err!("rocksdb iterator", err))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(Self::decode(&value)?);
        }
        Ok(out)
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, OracleError> {
        bincode::DefaultOptions::new().with_fixint_encoding().serialize(value).map_err(|err| err.into())
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, OracleError> {
        bincode::DefaultOptions::new().with_fixint_encoding().deserialize(bytes).map_err(|err| err.into())
    }

    fn key_task(id: TaskId) -> Vec<u8> {
        KeyBuilder::with_capacity(5 + 8).prefix(b"task:").u64_be(id).build()
    }

    fn key_due(next_check: u64, id: TaskId) -> Vec<u8> {
        KeyBuilder::with_capacity(4 + 8 + 8).prefix(b"due:").u64_be(next_check).u64_be(id).build()
    }

    fn key_group_prefix(filter_field: &str) -> Vec<u8> {
        KeyBuilder::with_capacity(4 + filter_field.len() + 1).prefix(b"grp:").str(filter_field).sep().build()
    }

    fn key_group(filter_field: &str, id: TaskId) -> Vec<u8> {
        KeyBuilder::with_capacity(4 + filter_field.len() + 1 + 8).prefix(b"grp:").str(filter_field).sep().u64_be(id).build()
    }

    fn key_handled(rqhs: &Rqhs) -> Vec<u8> {
        KeyBuilder::with_capacity(5 + 32).prefix(b"rqhs:").hash32(rqhs.as_hash()).build()
    }

    fn key_locked(pwtxid: &Pwtxid) -> Vec<u8> {
        KeyBuilder::with_capacity(3 + pwtxid.len()).prefix(b"pw:").str(pwtxid.as_str()).build()
    }

    fn key_rsa(pwtxid: &Pwtxid) -> Vec<u8> {
        KeyBuilder::with_capacity(4 + pwtxid.len()).prefix(b"rsa:").str(pwtxid.as_str()).build()
    }

    fn key_guess_prefix(pwtxid: &Pwtxid) -> Vec<u8> {
        KeyBuilder::with_capacity(6 + pwtxid.len() + 1).prefix(b"guess:").str(pwtxid.as_str()).sep().build()
    }

    fn key_guess(pwtxid: &Pwtxid, key_hash: &str, message_id: &str) -> Vec<u8> {
        KeyBuilder::with_capacity(6 + pwtxid.len() + 1 + key_hash.len() + 1 + message_id.len())
            .prefix(b"guess:")
            .str(pwtxid.as_str())
            .sep()
            .str(key_hash)
            .sep()
            .str(message_id)
            .build()
    }

    fn key_signed(seq: u64) -> Vec<u8> {
        KeyBuilder::with_capacity(4 + 8).prefix(b"sig:").u64_be(seq).build()
    }

    fn key_signed_by_task(task_id: TaskId) -> Vec<u8> {
        KeyBuilder::with_capacity(5 + 8).prefix(b"tsig:").u64_be(task_id).build()
    }

    fn key_sent(seq: u64) -> Vec<u8> {
        KeyBuilder::with_capacity(5 + 8).prefix(b"sent:").u64_be(seq).build()
    }
}
