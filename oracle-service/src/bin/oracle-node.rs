#[path = "oracle-node/cli.rs"]
mod cli;
#[path = "oracle-node/modes/mod.rs"]
mod modes;
#[path = "oracle-node/setup.rs"]
mod setup;

use cli::Cli;
use log::info;
use oracle_core::application::Oracle;
use oracle_core::foundation::OracleError;
use oracle_core::infrastructure::storage::Storage;
use oracle_service::service::{
    spawn_identity_heartbeat, spawn_inbox_loop, spawn_scheduler_loop, spawn_status_reporter, LoopIntervals, Metrics, ServiceHandles,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse_args();
    setup::init_logging(&args.log_level, args.log_dir.as_deref())?;
    args.apply_to_env();
    info!("oracle-node starting log_level={}", args.log_level);

    let app_config = setup::load_app_config()?;
    let storage = setup::init_storage(&app_config)?;
    info!("storage initialized data_dir={}", app_config.service.data_dir);

    if args.dump_tasks {
        info!("dump-tasks mode requested");
        modes::inspect::dump_tasks(storage.as_ref())?;
        return Ok(());
    }

    setup::log_startup_banner(&app_config);
    let ctx = setup::init_context(&app_config, storage.clone()).await?;
    let oracle = Arc::new(Oracle::new(ctx, app_config.runtime.task_workers));
    let metrics = Arc::new(Metrics::new()?);

    let runtime = &app_config.runtime;
    let intervals = LoopIntervals {
        scheduler: Duration::from_secs(runtime.scheduler_interval_secs),
        inbox: Duration::from_secs(runtime.inbox_poll_secs),
        identity: Duration::from_secs(runtime.identity_broadcast_secs),
        status: Duration::from_secs(runtime.status_report_secs),
    };
    let storage_dyn: Arc<dyn Storage> = storage;
    let (mut handles, shutdown) = ServiceHandles::new();
    handles.push(spawn_inbox_loop(oracle.clone(), metrics.clone(), intervals.inbox, shutdown.clone()));
    handles.push(spawn_scheduler_loop(oracle.clone(), metrics.clone(), intervals.scheduler, shutdown.clone()));
    handles.push(spawn_identity_heartbeat(oracle.clone(), metrics.clone(), intervals.identity, shutdown.clone()));
    handles.push(spawn_status_reporter(metrics, storage_dyn, intervals.status, shutdown));
    info!("oracle node running loops={}; waiting for ctrl-c", handles.len());

    tokio::signal::ctrl_c().await.map_err(|err| OracleError::Message(err.to_string()))?;
    info!("shutdown signal received");
    handles.shutdown().await;
    info!("oracle node stopped");
    Ok(())
}
