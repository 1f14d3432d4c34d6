use super::{already_signed, check_multisig, mark_group_done, ContractHandler};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{DropReason, Request, RequestOutcome, TaskOutcome};
use crate::application::signer::{sign_and_broadcast, SignRequest};
use crate::domain::hashes::request_hash;
use crate::domain::selection::{completes_threshold, select_conditioned_survivor, supersedes, ConditionedCandidate};
use crate::domain::task::rqhs_filter;
use crate::domain::{ConditionedTransactionRequest, NewTask, Operation, Task};
use crate::foundation::util::time::now_secs;
use crate::foundation::{MessageId, OracleError, Result, Rqhs, TaskId};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionedPayload {
    pub rqhs: Rqhs,
    /// Signatures present when the request arrived.
    pub sigs: u32,
    pub request: ConditionedTransactionRequest,
    pub message_id: MessageId,
    pub received_time: u64,
}

pub struct ConditionedTransactionHandler;

#[async_trait]
impl ContractHandler for ConditionedTransactionHandler {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome> {
        let body: ConditionedTransactionRequest = request.decode()?;
        check_multisig(body.req_sigs, &body.pubkey_list)?;
        ctx.evaluator.validate(&body.condition)?;

        let raw = body.transaction.raw_transaction.as_str();
        let template = ctx.call("wallet.decode_transaction", ctx.wallet.decode_transaction(raw)).await?;
        if template.inputs.is_empty() || template.outputs.is_empty() {
            return Ok(RequestOutcome::Dropped(DropReason::Invalid("transaction without inputs or outputs".to_string())));
        }
        let sigs = ctx.call("wallet.signatures_number", ctx.wallet.signatures_number(raw, &body.transaction.prevtx)).await?;
        let rqhs = request_hash(&body, &template);
        let group = rqhs_filter(&rqhs);

        let _guard = ctx.locks.lock(&group).await;
        let stored = ctx.storage.signs_for_transaction(&rqhs)?;
        if !supersedes(stored, sigs) {
            debug!("conditioned request superseded rqhs={} sigs={} max_sigs={:?}", rqhs, sigs, stored);
            return Ok(RequestOutcome::Dropped(DropReason::Superseded));
        }

        let now = now_secs();
        let payload = ConditionedPayload {
            rqhs,
            sigs,
            request: body,
            message_id: request.message.message_id.clone(),
            received_time: request.message.received_time,
        };
        let task = ctx.storage.enqueue_task(NewTask::new(Operation::ConditionedTransaction, &payload, now)?.with_filter(group))?;
        ctx.storage.record_max_sigs(&rqhs, sigs, now)?;
        info!("conditioned request queued rqhs={} task_id={} sigs={} previous_max={:?}", rqhs, task.id, sigs, stored);
        Ok(RequestOutcome::Accepted { tasks_created: 1 })
    }

    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
        let payload: ConditionedPayload = task.decode_payload()?;
        let group = rqhs_filter(&payload.rqhs);
        let _guard = ctx.locks.lock(&group).await;

        if already_signed(ctx.storage.as_ref(), task)? {
            mark_group_done(ctx.storage.as_ref(), &group)?;
            return Ok(TaskOutcome::Completed);
        }

        let request = &payload.request;
        let condition_context = json!({
            "request": request,
            "sigs": payload.sigs,
            "received_time": payload.received_time,
            "now": now_secs(),
        });
        let holds = ctx
            .evaluator
            .evaluate(&request.condition, &condition_context)
            .map_err(|err| OracleError::invariant(format!("conditioned task id={}", task.id), err))?;
        if !holds {
            info!("condition does not hold rqhs={} task_id={}", payload.rqhs, task.id);
            mark_group_done(ctx.storage.as_ref(), &group)?;
            return Ok(TaskOutcome::Completed);
        }

        let raw = request.transaction.raw_transaction.as_str();
        let prevtxs = &request.transaction.prevtx;
        let present = ctx.call("wallet.signatures_number", ctx.wallet.signatures_number(raw, prevtxs)).await?;
        if !completes_threshold(present, request.req_sigs) {
            debug!("waiting for signatures rqhs={} task_id={} present={} req_sigs={}", payload.rqhs, task.id, present, request.req_sigs);
            return Ok(TaskOutcome::Pending);
        }

        sign_and_broadcast(
            ctx,
            SignRequest {
                key: payload.rqhs.to_string(),
                task_id: Some(task.id),
                raw_transaction: raw,
                prevtxs,
                req_sigs: request.req_sigs,
            },
        )
        .await?;
        mark_group_done(ctx.storage.as_ref(), &group)?;
        Ok(TaskOutcome::Completed)
    }

    fn select_survivor(&self, group: &[Task]) -> Option<TaskId> {
        let candidates: Vec<ConditionedCandidate> = group
            .iter()
            .filter_map(|task| match task.decode_payload::<ConditionedPayload>() {
                Ok(payload) => Some(ConditionedCandidate { task_id: task.id, sigs: payload.sigs }),
                Err(err) => {
                    warn!("conditioned task skipped in selection id={} error={}", task.id, err);
                    None
                }
            })
            .collect();
        select_conditioned_survivor(&candidates).map(|candidate| candidate.task_id)
    }
}
