use super::locked::{open_contract, prepare, record_release, register};
use super::{stored_request, ContractHandler};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{Request, RequestOutcome, TaskOutcome};
use crate::application::signer::{sign, SignRequest};
use crate::domain::{NewTask, Operation, Task, TimelockCreateRequest};
use crate::foundation::{Pwtxid, Result};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockPayload {
    pub pwtxid: Pwtxid,
    pub raw_transaction: String,
}

pub struct TimelockCreateHandler;

#[async_trait]
impl ContractHandler for TimelockCreateHandler {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome> {
        let body: TimelockCreateRequest = request.decode()?;
        let prepared = prepare(ctx, &body.funds, &body.return_address).await?;
        let payload = TimelockPayload { pwtxid: prepared.pwtxid.clone(), raw_transaction: prepared.raw_transaction };
        let task = NewTask::new(Operation::TimelockCreate, &payload, body.funds.locktime)?;
        register(ctx, request, &prepared.pwtxid, task).await
    }

    /// Counter-signs unconditionally once the locktime is reached.
    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
        let payload: TimelockPayload = task.decode_payload()?;
        let Some(locked) = open_contract(ctx, &payload.pwtxid, task).await? else {
            return Ok(TaskOutcome::Completed);
        };
        let request: TimelockCreateRequest = stored_request(&locked)?;

        let sign_request = SignRequest {
            key: payload.pwtxid.to_string(),
            task_id: Some(task.id),
            raw_transaction: &payload.raw_transaction,
            prevtxs: &request.funds.prevtxs,
            req_sigs: request.funds.req_sigs,
        };
        let signed = sign(ctx, &sign_request).await?;
        if record_release(ctx, &payload.pwtxid, task, &sign_request, signed).await? {
            info!("timelock released pwtxid={} task_id={}", payload.pwtxid, task.id);
        }
        Ok(TaskOutcome::Completed)
    }
}
