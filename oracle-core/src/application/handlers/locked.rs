//! Creation and release flow shared by the timelock and pricecheck contracts.
//!
//! Release tasks hold the contract lock only while reading or writing records. Wallet and
//! price-feed calls run unlocked, and the state is checked again before a signature is kept.

use super::{already_signed, announce_created, derive_pwtxid, load_locked};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{DropReason, Request, RequestOutcome};
use crate::application::signer::{broadcast, SignRequest};
use crate::domain::payout::locked_outputs;
use crate::domain::transaction::inputs_from_prevtxs;
use crate::domain::{LockedFunds, LockedPasswordTransaction, NewTask, SignedTransaction, Task};
use crate::foundation::util::time::now_secs;
use crate::foundation::{Pwtxid, Result};
use log::{debug, info};

pub(super) struct PreparedLock {
    pub pwtxid: Pwtxid,
    pub raw_transaction: String,
}

/// Validates the outputs and builds the release transaction paying change to `return_address`.
pub(super) async fn prepare(ctx: &OracleContext, funds: &LockedFunds, return_address: &str) -> Result<PreparedLock> {
    let outputs = locked_outputs(funds, return_address)?;
    let pwtxid = derive_pwtxid(ctx, funds.req_sigs, &funds.pubkey_list).await?;
    let raw_transaction = build_release(ctx, funds, return_address).await?;
    debug!("locked contract prepared pwtxid={} outputs={}", pwtxid, outputs.len());
    Ok(PreparedLock { pwtxid, raw_transaction })
}

pub(super) async fn build_release(ctx: &OracleContext, funds: &LockedFunds, return_address: &str) -> Result<String> {
    let outputs = locked_outputs(funds, return_address)?;
    let inputs = inputs_from_prevtxs(&funds.prevtxs);
    ctx.call("wallet.build_raw_transaction", ctx.wallet.build_raw_transaction(&inputs, &outputs, funds.locktime)).await
}

/// Persists the contract, queues its release task and announces it. A taken pwtxid is a duplicate.
pub(super) async fn register(ctx: &OracleContext, request: &Request, pwtxid: &Pwtxid, task: NewTask) -> Result<RequestOutcome> {
    let guard = ctx.locks.lock(pwtxid).await;
    let now = now_secs();
    let locked = LockedPasswordTransaction {
        pwtxid: pwtxid.clone(),
        operation: request.operation,
        request_json: request.body.to_string(),
        done: false,
        created_at: now,
    };
    if !ctx.storage.insert_locked_transaction(locked, None)? {
        debug!("locked contract already exists pwtxid={} operation={}", pwtxid, request.operation);
        return Ok(RequestOutcome::Dropped(DropReason::Duplicate));
    }
    let task = ctx.storage.enqueue_task(task)?;
    drop(guard);

    info!("locked contract created pwtxid={} operation={} task_id={} next_check={}", pwtxid, request.operation, task.id, task.next_check);
    announce_created(ctx, request.operation, pwtxid, &request.message.message_id, None).await;
    Ok(RequestOutcome::Accepted { tasks_created: 1 })
}

/// Loads a contract due for release. `None` once it is closed or this task already signed,
/// in which case both are marked done.
pub(super) async fn open_contract(ctx: &OracleContext, pwtxid: &Pwtxid, task: &Task) -> Result<Option<LockedPasswordTransaction>> {
    let _guard = ctx.locks.lock(pwtxid).await;
    let storage = ctx.storage.as_ref();
    let locked = load_locked(storage, pwtxid, task)?;
    if locked.done || already_signed(storage, task)? {
        storage.mark_locked_transaction_done(pwtxid)?;
        storage.mark_task_done(task.id)?;
        return Ok(None);
    }
    Ok(Some(locked))
}

/// Keeps a release signed outside the lock, closes the contract and announces it.
/// Returns `false` and drops `signed` when another run closed the contract first.
pub(super) async fn record_release(
    ctx: &OracleContext,
    pwtxid: &Pwtxid,
    task: &Task,
    request: &SignRequest<'_>,
    signed: SignedTransaction,
) -> Result<bool> {
    {
        let _guard = ctx.locks.lock(pwtxid).await;
        let storage = ctx.storage.as_ref();
        let locked = load_locked(storage, pwtxid, task)?;
        if locked.done || already_signed(storage, task)? {
            debug!("release closed concurrently pwtxid={} task_id={}", pwtxid, task.id);
            storage.mark_task_done(task.id)?;
            return Ok(false);
        }
        storage.insert_signed_transaction(signed.clone())?;
        storage.mark_locked_transaction_done(pwtxid)?;
        storage.mark_task_done(task.id)?;
    }
    broadcast(ctx, request, &signed).await;
    Ok(true)
}
