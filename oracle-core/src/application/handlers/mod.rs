//! Contract handlers: one per operation, each owning the request side and the task side.

mod bounty_create;
mod bounty_redeem;
mod conditioned;
mod locked;
mod pricecheck;
mod timelock;

pub use bounty_create::{BountyCreateHandler, BountyExpiryPayload};
pub use bounty_redeem::{BountyRedeemHandler, GuessPayload};
pub use conditioned::{ConditionedPayload, ConditionedTransactionHandler};
pub use pricecheck::{PricecheckCreateHandler, PricecheckPayload};
pub use timelock::{TimelockCreateHandler, TimelockPayload};

use crate::application::context::OracleContext;
use crate::application::dispatcher::{Request, RequestOutcome, TaskOutcome};
use crate::domain::protocol::CreatedReply;
use crate::domain::{LockedPasswordTransaction, Operation, Task};
use crate::foundation::{MessageId, OracleError, Pwtxid, Result, TaskId};
use crate::foundation::util::ResultExt;
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[async_trait]
pub trait ContractHandler: Send + Sync {
    async fn handle_request(&self, ctx: &OracleContext, request: &Request) -> Result<RequestOutcome>;

    async fn handle_task(&self, ctx: &OracleContext, task: &Task) -> Result<TaskOutcome>;

    /// Picks the one task of a filter group that may run. `group` holds pending tasks ordered by id.
    fn select_survivor(&self, group: &[Task]) -> Option<TaskId> {
        group.first().map(|task| task.id)
    }
}

pub fn handler_for(operation: Operation) -> &'static dyn ContractHandler {
    match operation {
        Operation::ConditionedTransaction => &ConditionedTransactionHandler,
        Operation::TimelockCreate => &TimelockCreateHandler,
        Operation::PricecheckCreate => &PricecheckCreateHandler,
        Operation::BountyCreate => &BountyCreateHandler,
        Operation::BountyRedeem => &BountyRedeemHandler,
    }
}

/// Rejects multisig parameters the wallet would choke on.
fn check_multisig(req_sigs: u32, pubkeys: &[String]) -> Result<()> {
    if req_sigs == 0 || req_sigs as usize > pubkeys.len() {
        return Err(OracleError::InvalidTransaction(format!("req_sigs {} out of range for {} pubkeys", req_sigs, pubkeys.len())));
    }
    if pubkeys.iter().any(|key| key.trim().is_empty()) {
        return Err(OracleError::InvalidTransaction("empty pubkey in pubkey_list".to_string()));
    }
    Ok(())
}

/// A locked contract is identified by the multisig address holding its funds.
async fn derive_pwtxid(ctx: &OracleContext, req_sigs: u32, pubkeys: &[String]) -> Result<Pwtxid> {
    check_multisig(req_sigs, pubkeys)?;
    let address = ctx.call("wallet.derive_multisig_address", ctx.wallet.derive_multisig_address(req_sigs, pubkeys)).await?;
    Ok(Pwtxid::new(address))
}

async fn announce_created(ctx: &OracleContext, operation: Operation, pwtxid: &Pwtxid, in_reply_to: &MessageId, rsa_pubkey: Option<Value>) {
    let Some(reply_name) = operation.created_reply() else {
        return;
    };
    let mut reply = CreatedReply::new(reply_name, pwtxid.clone(), in_reply_to.clone());
    reply.rsa_pubkey = rsa_pubkey;
    ctx.broadcast_json(&reply.subject(), &reply).await;
}

/// Original request of a locked contract, as persisted at creation time.
fn stored_request<T: DeserializeOwned>(locked: &LockedPasswordTransaction) -> Result<T> {
    serde_json::from_str(&locked.request_json)
        .map_err(|err| OracleError::invariant(format!("{} stored request pwtxid={}", locked.operation, locked.pwtxid), err))
}

fn load_locked(storage: &dyn Storage, pwtxid: &Pwtxid, task: &Task) -> Result<LockedPasswordTransaction> {
    storage
        .get_locked_transaction(pwtxid)
        .required(|| OracleError::invariant(format!("{} task id={}", task.operation, task.id), format!("no locked transaction {}", pwtxid)))
}

fn mark_group_done(storage: &dyn Storage, group: &str) -> Result<usize> {
    let mut closed = 0;
    for task in storage.pending_tasks_in_group(group)? {
        if storage.mark_task_done(task.id)? {
            closed += 1;
        }
    }
    debug!("task group closed group={} closed={}", group, closed);
    Ok(closed)
}

/// A task may run again after a crash between signing and marking it done; the audit record tells.
fn already_signed(storage: &dyn Storage, task: &Task) -> Result<bool> {
    Ok(storage.signed_transaction_for_task(task.id)?.is_some())
}
