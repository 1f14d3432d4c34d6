use super::locked::{build_release, open_contract, prepare, record_release, register};
use super::{stored_request, ContractHandler};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{Request, RequestOutcome, TaskOutcome};
use crate::application::signer::{sign, SignRequest};
use crate::domain::payout::locked_outputs;
use crate::domain::{NewTask, Operation, PricecheckCreateRequest, Task};
use crate::foundation::util::time::now_secs;
use crate::foundation::{OracleError, Pwtxid, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricecheckPayload {
    pub pwtxid: Pwtxid,
    /// Consecutive failed price fetches before this task was queued.
    #[serde(default)]
    pub retries: u32,
}

pub struct PricecheckCreateHandler;

#[async_trait]
impl ContractHandler for PricecheckCreateHandler {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome> {
        let body: PricecheckCreateRequest = request.decode()?;
        // both branches must be spendable before the contract is accepted
        locked_outputs(&body.funds, &body.return_if_lesser)?;
        let prepared = prepare(ctx, &body.funds, &body.return_if_greater).await?;
        let payload = PricecheckPayload { pwtxid: prepared.pwtxid.clone(), retries: 0 };
        let task = NewTask::new(Operation::PricecheckCreate, &payload, body.funds.locktime)?;
        register(ctx, request, &prepared.pwtxid, task).await
    }

    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
        let payload: PricecheckPayload = task.decode_payload()?;
        let Some(locked) = open_contract(ctx, &payload.pwtxid, task).await? else {
            return Ok(TaskOutcome::Completed);
        };
        let request: PricecheckCreateRequest = stored_request(&locked)?;

        let last_price = match ctx.call("price_feed.last_price", ctx.price_feed.last_price()).await {
            Ok(price) => price,
            Err(err) => {
                let _guard = ctx.locks.lock(&payload.pwtxid).await;
                return retry_later(ctx, task, &payload, err);
            }
        };

        let recipient = request.return_address_for(last_price);
        let raw_transaction = build_release(ctx, &request.funds, recipient)
            .await
            .map_err(|err| if err.is_transient() { err } else { OracleError::invariant(format!("pricecheck task id={}", task.id), err) })?;
        let sign_request = SignRequest {
            key: payload.pwtxid.to_string(),
            task_id: Some(task.id),
            raw_transaction: &raw_transaction,
            prevtxs: &request.funds.prevtxs,
            req_sigs: request.funds.req_sigs,
        };
        let signed = sign(ctx, &sign_request).await?;
        if record_release(ctx, &payload.pwtxid, task, &sign_request, signed).await? {
            info!(
                "pricecheck released pwtxid={} task_id={} last_price={} threshold={} recipient={}",
                payload.pwtxid, task.id, last_price, request.price, recipient
            );
        }
        Ok(TaskOutcome::Completed)
    }
}

/// Replaces the task with a later one, or parks it once the retry budget is spent.
/// The caller holds the contract lock.
fn retry_later(ctx: &OracleContext, task: &Task, payload: &PricecheckPayload, err: OracleError) -> Result<TaskOutcome> {
    let storage = ctx.storage.as_ref();
    if storage.get_task(task.id)?.map_or(true, |current| current.done) {
        debug!("pricecheck retry already handled pwtxid={} task_id={}", payload.pwtxid, task.id);
        return Ok(TaskOutcome::Completed);
    }
    if payload.retries >= ctx.policy.pricecheck_max_retries {
        error!("pricecheck parked pwtxid={} task_id={} failures={} error={}", payload.pwtxid, task.id, payload.retries + 1, err);
        storage.park_task(task.id)?;
        return Ok(TaskOutcome::Parked);
    }
    let next_check = now_secs().saturating_add(ctx.policy.pricecheck_retry_interval_secs);
    let next = PricecheckPayload { pwtxid: payload.pwtxid.clone(), retries: payload.retries + 1 };
    let next_task = storage.enqueue_task(NewTask::new(Operation::PricecheckCreate, &next, next_check)?)?;
    storage.mark_task_done(task.id)?;
    warn!(
        "price fetch failed, rescheduled pwtxid={} task_id={} next_task={} retry={} next_check={} error={}",
        payload.pwtxid, task.id, next_task.id, next.retries, next_check, err
    );
    Ok(TaskOutcome::Rescheduled { next_task: next_task.id })
}
