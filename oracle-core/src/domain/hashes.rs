use crate::domain::contract::ConditionedTransactionRequest;
use crate::domain::transaction::TxTemplate;
use crate::foundation::Rqhs;
use blake3::Hasher;

const RQHS_DOMAIN_V1: &[u8] = b"oracle:rqhs:v1:";

/// Identity of a conditioned request, independent of how many signatures the transaction carries.
///
/// Covers condition, locktime, required signatures, the sorted pubkey set, and the
/// decoded inputs/outputs/locktime of the transaction.
pub fn request_hash(request: &ConditionedTransactionRequest, template: &TxTemplate) -> Rqhs {
    let mut hasher = Hasher::new();
    hasher.update(RQHS_DOMAIN_V1);

    update_str(&mut hasher, &request.condition);
    match request.locktime {
        Some(locktime) => {
            hasher.update(&[1]);
            hasher.update(&locktime.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&request.req_sigs.to_le_bytes());

    let mut pubkeys: Vec<&str> = request.pubkey_list.iter().map(String::as_str).collect();
    pubkeys.sort_unstable();
    hasher.update(&(pubkeys.len() as u32).to_le_bytes());
    for pubkey in pubkeys {
        update_str(&mut hasher, pubkey);
    }

    encode_template_v1(template, &mut hasher);
    Rqhs::new(*hasher.finalize().as_bytes())
}

fn encode_template_v1(template: &TxTemplate, hasher: &mut Hasher) {
    hasher.update(&(template.inputs.len() as u32).to_le_bytes());
    for input in &template.inputs {
        update_str(hasher, &input.txid);
        hasher.update(&input.vout.to_le_bytes());
    }
    hasher.update(&(template.outputs.len() as u32).to_le_bytes());
    for output in &template.outputs {
        update_str(hasher, &output.address);
        hasher.update(&output.amount_satoshi.to_le_bytes());
    }
    hasher.update(&template.locktime.to_le_bytes());
}

fn update_str(hasher: &mut Hasher, value: &str) {
    hasher.update(&(value.len() as u32).to_le_bytes());
    hasher.update(value.as_bytes());
}
