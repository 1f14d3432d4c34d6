//! Output construction for locked contracts.

use crate::domain::contract::{BountyCreateRequest, LockedFunds};
use crate::domain::transaction::TxOutput;
use crate::foundation::{OracleError, Result};

/// Collapses outputs paying the same address into one, keeping first-seen order.
///
/// Node wallets refuse a transaction that names an address twice.
pub fn merge_outputs(outputs: Vec<TxOutput>) -> Result<Vec<TxOutput>> {
    let mut merged: Vec<TxOutput> = Vec::with_capacity(outputs.len());
    for output in outputs {
        match merged.iter_mut().find(|existing| existing.address == output.address) {
            Some(existing) => {
                existing.amount_satoshi = existing.amount_satoshi.checked_add(output.amount_satoshi).ok_or_else(|| {
                    OracleError::InvalidAmount { field: "outputs".to_string(), details: format!("total to {} overflows", output.address) }
                })?;
            }
            None => merged.push(output),
        }
    }
    Ok(merged)
}

/// Claimant output first, then one output per oracle fee. A fee address equal to the claimant
/// is folded into the claimant output.
///
/// The claimant receives `sum_amount - miners_fee - sum(oracle_fees)`.
pub fn bounty_outputs(request: &BountyCreateRequest, recipient: &str) -> Result<Vec<TxOutput>> {
    let fees: u64 = request.oracle_fees.values().map(|fee| fee.satoshi()).try_fold(0u64, |acc, fee| acc.checked_add(fee)).ok_or_else(
        || OracleError::InvalidAmount { field: "oracle_fees".to_string(), details: "fee total overflows".to_string() },
    )?;
    let spent = fees
        .checked_add(request.miners_fee.satoshi())
        .ok_or_else(|| OracleError::InvalidAmount { field: "miners_fee".to_string(), details: "fee total overflows".to_string() })?;
    let claimant = request.sum_amount.satoshi().checked_sub(spent).filter(|amount| *amount > 0).ok_or_else(|| {
        OracleError::InvalidAmount {
            field: "sum_amount".to_string(),
            details: format!("sum {} does not cover fees {}", request.sum_amount, spent),
        }
    })?;

    let mut outputs = Vec::with_capacity(request.oracle_fees.len() + 1);
    outputs.push(TxOutput::new(recipient, claimant));
    for (address, fee) in &request.oracle_fees {
        outputs.push(TxOutput::new(address.clone(), fee.satoshi()));
    }
    merge_outputs(outputs)
}

/// Requested outputs plus change to `return_address`; fails when the outputs overspend the locked sum.
pub fn locked_outputs(funds: &LockedFunds, return_address: &str) -> Result<Vec<TxOutput>> {
    if funds.prevtxs.is_empty() {
        return Err(OracleError::InvalidTransaction("no previous outputs to spend".to_string()));
    }
    if funds.req_sigs == 0 || funds.req_sigs as usize > funds.pubkey_list.len() {
        return Err(OracleError::InvalidTransaction(format!(
            "req_sigs {} out of range for {} pubkeys",
            funds.req_sigs,
            funds.pubkey_list.len()
        )));
    }
    if return_address.trim().is_empty() {
        return Err(OracleError::InvalidTransaction("empty return address".to_string()));
    }

    let mut outputs = Vec::with_capacity(funds.outputs.len() + 1);
    let mut paid = funds.miners_fee_satoshi;
    for output in &funds.outputs {
        if output.value == 0 || output.address.trim().is_empty() {
            return Err(OracleError::InvalidTransaction(format!("invalid output to '{}'", output.address)));
        }
        paid = paid
            .checked_add(output.value)
            .ok_or_else(|| OracleError::InvalidAmount { field: "outputs".to_string(), details: "output total overflows".to_string() })?;
        outputs.push(TxOutput::new(output.address.clone(), output.value));
    }

    let change = funds.sum_satoshi.checked_sub(paid).ok_or_else(|| OracleError::InvalidAmount {
        field: "sum_satoshi".to_string(),
        details: format!("outputs and fee {} exceed sum {}", paid, funds.sum_satoshi),
    })?;
    if change > 0 {
        outputs.push(TxOutput::new(return_address, change));
    }
    if outputs.is_empty() {
        return Err(OracleError::InvalidTransaction("transaction has no outputs".to_string()));
    }
    merge_outputs(outputs)
}
