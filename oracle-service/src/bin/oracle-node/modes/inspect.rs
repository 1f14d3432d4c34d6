use oracle_core::application::OracleSnapshot;
use oracle_core::foundation::OracleError;
use oracle_core::infrastructure::storage::Storage;

pub fn dump_tasks(storage: &dyn Storage) -> Result<(), OracleError> {
    let snapshot = OracleSnapshot {
        stats: storage.task_stats()?,
        pending_tasks: storage.pending_tasks()?,
        locked_transactions: storage.list_locked_transactions()?,
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    println!("{}", json);
    Ok(())
}
