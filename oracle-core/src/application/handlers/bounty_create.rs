use super::{announce_created, check_multisig, derive_pwtxid, load_locked, stored_request, ContractHandler};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{DropReason, Request, RequestOutcome, TaskOutcome};
use crate::application::signer::{sign_and_broadcast, SignRequest};
use crate::domain::blind::BlindKeyPair;
use crate::domain::payout::bounty_outputs;
use crate::domain::transaction::inputs_from_prevtxs;
use crate::domain::{BountyCreateRequest, LockedPasswordTransaction, NewTask, Operation, SentKind, SentPasswordTransaction, Task};
use crate::foundation::util::encoding::is_sha256_hex;
use crate::foundation::util::time::now_secs;
use crate::foundation::{OracleError, Pwtxid, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of the task that refunds an unclaimed bounty at its locktime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyExpiryPayload {
    pub pwtxid: Pwtxid,
}

pub struct BountyCreateHandler;

fn validate(body: &BountyCreateRequest) -> Result<()> {
    if !is_sha256_hex(&body.password_hash) {
        return Err(OracleError::MalformedRequest(format!("password_hash is not a sha256 hex digest: {}", body.password_hash)));
    }
    if body.prevtx.is_empty() {
        return Err(OracleError::InvalidTransaction("no previous outputs to spend".to_string()));
    }
    if body.return_address.trim().is_empty() {
        return Err(OracleError::InvalidTransaction("empty return address".to_string()));
    }
    check_multisig(body.req_sigs, &body.pubkey_list)?;
    bounty_outputs(body, &body.return_address).map(|_| ())
}

#[async_trait]
impl ContractHandler for BountyCreateHandler {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome> {
        let body: BountyCreateRequest = request.decode()?;
        validate(&body)?;
        let pwtxid = derive_pwtxid(ctx, body.req_sigs, &body.pubkey_list).await?;
        if ctx.storage.get_locked_transaction(&pwtxid)?.is_some() {
            debug!("bounty already exists pwtxid={}", pwtxid);
            return Ok(RequestOutcome::Dropped(DropReason::Duplicate));
        }

        let bits = ctx.policy.rsa_key_bits;
        let keypair = tokio::task::spawn_blocking(move || BlindKeyPair::generate(bits))
            .await
            .map_err(|err| OracleError::crypto("rsa keygen task", err))??;
        let rsa_pubkey = serde_json::to_value(keypair.public())?;

        let mut stored_body = request.body.clone();
        if let Value::Object(map) = &mut stored_body {
            map.insert("rsa_pubkey".to_string(), rsa_pubkey.clone());
        }

        let guard = ctx.locks.lock(&pwtxid).await;
        let now = now_secs();
        let locked = LockedPasswordTransaction {
            pwtxid: pwtxid.clone(),
            operation: Operation::BountyCreate,
            request_json: stored_body.to_string(),
            done: false,
            created_at: now,
        };
        if !ctx.storage.insert_locked_transaction(locked, Some(keypair.to_record(&pwtxid, now)?))? {
            debug!("bounty already exists pwtxid={}", pwtxid);
            return Ok(RequestOutcome::Dropped(DropReason::Duplicate));
        }
        let mut tasks_created = 0;
        if let Some(locktime) = body.locktime {
            let task = ctx.storage.enqueue_task(NewTask::new(Operation::BountyCreate, &BountyExpiryPayload { pwtxid: pwtxid.clone() }, locktime)?)?;
            debug!("bounty expiry queued pwtxid={} task_id={} locktime={}", pwtxid, task.id, locktime);
            tasks_created = 1;
        }
        drop(guard);

        info!(
            "bounty created pwtxid={} sum={} fees={} expires={:?} key_hash={}",
            pwtxid,
            body.sum_amount,
            body.oracle_fees.len(),
            body.locktime,
            keypair.public().key_hash()?
        );
        announce_created(ctx, Operation::BountyCreate, &pwtxid, &request.message.message_id, Some(rsa_pubkey)).await;
        Ok(RequestOutcome::Accepted { tasks_created })
    }

    /// Returns the funds of a bounty nobody claimed before its locktime.
    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
        let payload: BountyExpiryPayload = task.decode_payload()?;
        let _guard = ctx.locks.lock(&payload.pwtxid).await;
        let storage = ctx.storage.as_ref();

        let locked = load_locked(storage, &payload.pwtxid, task)?;
        if locked.done {
            debug!("bounty already closed pwtxid={} task_id={}", payload.pwtxid, task.id);
            storage.mark_task_done(task.id)?;
            return Ok(TaskOutcome::Completed);
        }
        let request: BountyCreateRequest = stored_request(&locked)?;
        // a refund signed before a crash is recorded as is
        let signed_hex = match storage.signed_transaction_for_task(task.id)? {
            Some(signed) => signed.hex_transaction,
            None => {
                let outputs = bounty_outputs(&request, &request.return_address)
                    .map_err(|err| OracleError::invariant(format!("bounty expiry task id={}", task.id), err))?;
                let inputs = inputs_from_prevtxs(&request.prevtx);
                let locktime = request.locktime.unwrap_or_default();
                let raw = ctx.call("wallet.build_raw_transaction", ctx.wallet.build_raw_transaction(&inputs, &outputs, locktime)).await?;
                let signed = sign_and_broadcast(
                    ctx,
                    SignRequest {
                        key: payload.pwtxid.to_string(),
                        task_id: Some(task.id),
                        raw_transaction: &raw,
                        prevtxs: &request.prevtx,
                        req_sigs: request.req_sigs,
                    },
                )
                .await?;
                signed.hex_transaction
            }
        };
        let recorded = storage.close_with_sent_transaction(SentPasswordTransaction {
            pwtxid: payload.pwtxid.clone(),
            kind: SentKind::Refund,
            tx: signed_hex,
            recipient: request.return_address.clone(),
            created_at: now_secs(),
        })?;
        if !recorded {
            debug!("refund already recorded pwtxid={} task_id={}", payload.pwtxid, task.id);
        }
        storage.mark_task_done(task.id)?;
        info!("bounty expired, refunded pwtxid={} task_id={} recipient={}", payload.pwtxid, task.id, request.return_address);
        Ok(TaskOutcome::Completed)
    }
}
