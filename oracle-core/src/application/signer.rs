use crate::application::context::OracleContext;
use crate::domain::protocol::subjects;
use crate::domain::{PrevTx, SignedTransaction, SignedTransactionBroadcast};
use crate::foundation::util::time::now_secs;
use crate::foundation::{Result, TaskId};
use log::{debug, info};

pub struct SignRequest<'a> {
    /// rqhs hex or pwtxid; names the contract in the audit record and the broadcast.
    pub key: String,
    pub task_id: Option<TaskId>,
    pub raw_transaction: &'a str,
    pub prevtxs: &'a [PrevTx],
    pub req_sigs: u32,
}

/// Adds the oracle's signature, appends the audit record, then announces the transaction.
pub async fn sign_and_broadcast(ctx: &OracleContext, request: SignRequest<'_>) -> Result<SignedTransaction> {
    let record = sign(ctx, &request).await?;
    ctx.storage.insert_signed_transaction(record.clone())?;
    broadcast(ctx, &request, &record).await;
    Ok(record)
}

/// Adds the oracle's signature and counts the result. Nothing is stored.
pub async fn sign(ctx: &OracleContext, request: &SignRequest<'_>) -> Result<SignedTransaction> {
    let signed_hex = ctx
        .call("wallet.sign", ctx.wallet.sign(request.raw_transaction, request.prevtxs, &ctx.policy.private_keys))
        .await?;
    let signatures = ctx.call("wallet.signatures_number", ctx.wallet.signatures_number(&signed_hex, request.prevtxs)).await?;
    debug!("transaction signed key={} task_id={:?} signatures={}", request.key, request.task_id, signatures);

    Ok(SignedTransaction {
        key: request.key.clone(),
        task_id: request.task_id,
        hex_transaction: signed_hex,
        prevtxs: request.prevtxs.to_vec(),
        signatures,
        created_at: now_secs(),
    })
}

/// Announces an already recorded signature. Returns whether the transport took it.
pub async fn broadcast(ctx: &OracleContext, request: &SignRequest<'_>, record: &SignedTransaction) -> bool {
    let broadcast =
        SignedTransactionBroadcast::new(request.key.clone(), record.hex_transaction.clone(), request.prevtxs.to_vec(), request.req_sigs);
    let delivered = ctx.broadcast_json(subjects::SIGNED_TRANSACTION, &broadcast).await;
    info!(
        "signed transaction recorded key={} task_id={:?} signatures={} req_sigs={} broadcast={}",
        request.key, request.task_id, record.signatures, request.req_sigs, delivered
    );
    delivered
}
