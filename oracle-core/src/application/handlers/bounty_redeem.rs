use super::{load_locked, mark_group_done, stored_request, ContractHandler};
use crate::application::context::OracleContext;
use crate::application::dispatcher::{DropReason, Request, RequestOutcome, TaskOutcome};
use crate::application::signer::{sign_and_broadcast, SignRequest};
use crate::domain::blind::BlindKeyPair;
use crate::domain::payout::bounty_outputs;
use crate::domain::selection::{select_guess_winner, GuessCandidate};
use crate::domain::task::guess_filter;
use crate::domain::transaction::inputs_from_prevtxs;
use crate::domain::{
    BountyCreateRequest, BountyRedeemRequest, NewTask, Operation, RightGuess, SentKind, SentPasswordTransaction, Task,
};
use crate::foundation::util::time::now_secs;
use crate::foundation::util::ResultExt;
use crate::foundation::{KeyHash, MessageId, OracleError, Pwtxid, Result, TaskId};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// One verified guess competing for a bounty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessPayload {
    pub pwtxid: Pwtxid,
    pub key_hash: KeyHash,
    pub message_id: MessageId,
    pub address: String,
    pub received_time: u64,
}

pub struct BountyRedeemHandler;

#[async_trait]
impl ContractHandler for BountyRedeemHandler {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome> {
        let body: BountyRedeemRequest = request.decode()?;
        let storage = ctx.storage.as_ref();
        let Some(locked) = storage.get_locked_transaction(&body.pwtxid)? else {
            debug!("guess for unknown bounty pwtxid={}", body.pwtxid);
            return Ok(RequestOutcome::Dropped(DropReason::UnknownContract));
        };
        if locked.operation != Operation::BountyCreate {
            return Ok(RequestOutcome::Dropped(DropReason::UnknownContract));
        }
        let record = storage
            .get_rsa_keypair(&body.pwtxid)
            .required(|| OracleError::invariant("bounty redeem", format!("no rsa keypair for {}", body.pwtxid)))?;
        let keypair = BlindKeyPair::from_record(&record)?;
        let bounty: BountyCreateRequest = stored_request(&locked)?;

        let _guard = ctx.locks.lock(&body.pwtxid).await;
        // re-read under the lock: the winner may have closed the bounty meanwhile
        let open = !is_closed(storage, &body.pwtxid)?;
        let message = &request.message;
        let mut recorded = 0;
        let mut tasks_created = 0;
        for (key_hash, ciphertext) in &body.passwords {
            let guess = match keypair.decrypt_guess(ciphertext) {
                Ok(guess) => guess,
                Err(err) => {
                    debug!("guess not readable pwtxid={} key_hash={} error={}", body.pwtxid, key_hash, err);
                    continue;
                }
            };
            if !guess.matches(&bounty.password_hash) {
                debug!("wrong guess pwtxid={} key_hash={} msgid={}", body.pwtxid, key_hash, message.message_id);
                continue;
            }
            let right = RightGuess {
                pwtxid: body.pwtxid.clone(),
                key_hash: KeyHash::new(key_hash.clone()),
                message_id: message.message_id.clone(),
                address: guess.address.clone(),
                received_time: message.received_time,
            };
            if !storage.insert_right_guess(right.clone())? {
                debug!("guess already recorded pwtxid={} key_hash={} msgid={}", body.pwtxid, key_hash, message.message_id);
                continue;
            }
            recorded += 1;
            if !open {
                info!("right guess for closed bounty recorded pwtxid={} address={}", body.pwtxid, right.address);
                continue;
            }
            let payload = GuessPayload {
                pwtxid: right.pwtxid,
                key_hash: right.key_hash,
                message_id: right.message_id,
                address: right.address,
                received_time: right.received_time,
            };
            let task = storage
                .enqueue_task(NewTask::new(Operation::BountyRedeem, &payload, now_secs())?.with_filter(guess_filter(&body.pwtxid)))?;
            info!("right guess queued pwtxid={} task_id={} received_time={}", body.pwtxid, task.id, payload.received_time);
            tasks_created += 1;
        }

        if recorded == 0 {
            return Ok(RequestOutcome::Dropped(DropReason::NoValidGuess));
        }
        Ok(RequestOutcome::Accepted { tasks_created })
    }

    /// Pays the earliest right guess of the group and closes the bounty.
    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
        let payload: GuessPayload = task.decode_payload()?;
        let group = guess_filter(&payload.pwtxid);
        let _guard = ctx.locks.lock(&payload.pwtxid).await;
        let storage = ctx.storage.as_ref();

        let locked = load_locked(storage, &payload.pwtxid, task)?;
        if locked.done {
            debug!("bounty already closed pwtxid={} task_id={}", payload.pwtxid, task.id);
            mark_group_done(storage, &group)?;
            return Ok(TaskOutcome::Completed);
        }

        let members: Vec<Task> = storage.pending_tasks_in_group(&group)?.into_iter().filter(|member| !member.is_parked()).collect();
        if let Some(winner) = self.select_survivor(&members) {
            if winner != task.id {
                debug!("guess outranked pwtxid={} task_id={} winner={}", payload.pwtxid, task.id, winner);
                return Ok(TaskOutcome::Pending);
            }
        }

        let bounty: BountyCreateRequest = stored_request(&locked)?;
        let signed_hex = match storage.signed_transaction_for_task(task.id)? {
            Some(signed) => signed.hex_transaction,
            None => {
                let outputs = bounty_outputs(&bounty, &payload.address)
                    .map_err(|err| OracleError::invariant(format!("bounty redeem task id={}", task.id), err))?;
                let inputs = inputs_from_prevtxs(&bounty.prevtx);
                let raw = ctx.call("wallet.build_raw_transaction", ctx.wallet.build_raw_transaction(&inputs, &outputs, 0)).await?;
                let signed = sign_and_broadcast(
                    ctx,
                    SignRequest {
                        key: payload.pwtxid.to_string(),
                        task_id: Some(task.id),
                        raw_transaction: &raw,
                        prevtxs: &bounty.prevtx,
                        req_sigs: bounty.req_sigs,
                    },
                )
                .await?;
                signed.hex_transaction
            }
        };

        let recorded = storage.close_with_sent_transaction(SentPasswordTransaction {
            pwtxid: payload.pwtxid.clone(),
            kind: SentKind::Payout,
            tx: signed_hex,
            recipient: payload.address.clone(),
            created_at: now_secs(),
        })?;
        if !recorded {
            debug!("payout already recorded pwtxid={} task_id={}", payload.pwtxid, task.id);
        }
        let closed = mark_group_done(storage, &group)?;
        info!(
            "bounty paid out pwtxid={} task_id={} recipient={} received_time={} competing={}",
            payload.pwtxid,
            task.id,
            payload.address,
            payload.received_time,
            closed.saturating_sub(1)
        );
        Ok(TaskOutcome::Completed)
    }

    fn select_survivor(&self, group: &[Task]) -> Option<TaskId> {
        let candidates: Vec<GuessCandidate> = group
            .iter()
            .filter_map(|task| match task.decode_payload::<GuessPayload>() {
                Ok(payload) => Some(GuessCandidate { task_id: task.id, received_time: payload.received_time }),
                Err(err) => {
                    warn!("guess task skipped in selection id={} error={}", task.id, err);
                    None
                }
            })
            .collect();
        select_guess_winner(&candidates).map(|candidate| candidate.task_id)
    }
}

fn is_closed(storage: &dyn Storage, pwtxid: &Pwtxid) -> Result<bool> {
    Ok(storage.get_locked_transaction(pwtxid)?.map(|locked| locked.done).unwrap_or(true))
}
