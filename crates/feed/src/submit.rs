//! Post submission: builds the `makePost` call either as a node `contract_call` request or
//! as a raw `CallContract` transaction for an external wallet.

use crate::error::SubmitError;
use crate::rpc::{self, LedgerRpc};
use codec::{
    dna_to_float_string, float_string_to_dna, hex_to_bytes, to_hex_string, ArgumentFormat,
    CallContractAttachment, CodecError, ContractArgument, Transaction, TransactionType,
};
use num_bigint::BigUint;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Amount attached to every post, in DNA.
pub const POST_AMOUNT_DNA: &str = "0.00001";
const PER_CHAR_MAX_FEE_DIVISOR: u32 = 200;
const TOTAL_MAX_FEE_MULTIPLIER: u32 = 10;

/// The single `string` argument of `makePost`: `{"message": ..., "replyToPostId"?: ...}`.
pub fn make_post_args(message: &str, reply_to_post_id: Option<&str>) -> Vec<ContractArgument> {
    let mut body = json!({ "message": message });
    if let Some(reply) = reply_to_post_id.filter(|r| !r.is_empty()) {
        body["replyToPostId"] = Value::String(reply.to_string());
    }
    vec![ContractArgument::new(0, ArgumentFormat::String, body.to_string())]
}

pub fn make_post_attachment(method: &str, args: &[ContractArgument]) -> Result<CallContractAttachment, CodecError> {
    let mut attachment = CallContractAttachment::new(method);
    attachment.set_args(args)?;
    Ok(attachment)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxFee {
    /// DNA decimal string, as `contract_call` expects it.
    pub dna: String,
    /// Atomic units, for the transaction field.
    pub atomic: BigUint,
}

/// Scale the node's fee estimate by post length: `(fee + fee / 200 * len) * 10`.
pub fn calculate_max_fee(estimate: &BigUint, post_len: usize) -> MaxFee {
    let scaled = estimate * (BigUint::from(PER_CHAR_MAX_FEE_DIVISOR) + BigUint::from(post_len))
        * TOTAL_MAX_FEE_MULTIPLIER
        / PER_CHAR_MAX_FEE_DIVISOR;
    MaxFee {
        dna: dna_to_float_string(&scaled),
        atomic: scaled,
    }
}

/// Ask the node for the unsigned transaction it would build and read its max fee.
/// Any failure yields zero, leaving the fee to the node.
pub async fn estimate_max_fee(
    rpc: &dyn LedgerRpc,
    from: &str,
    contract: &str,
    attachment: &CallContractAttachment,
) -> BigUint {
    let params = json!([{
        "from": from,
        "to": contract,
        "type": TransactionType::CallContract.as_u32(),
        "amount": POST_AMOUNT_DNA,
        "payload": to_hex_string(&attachment.to_bytes(), true),
        "useProto": true,
    }]);
    let raw = match rpc.call("bcn_getRawTx", params).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(reason = %e, "bcn_getRawTx failed, max fee left at zero");
            return BigUint::default();
        }
    };
    match raw.as_str().map(Transaction::from_hex) {
        Some(Ok(tx)) => tx.max_fee,
        Some(Err(e)) => {
            tracing::warn!(reason = %e, "raw transaction undecodable, max fee left at zero");
            BigUint::default()
        }
        None => BigUint::default(),
    }
}

/// `contract_call` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallRequest {
    pub from: String,
    pub contract: String,
    pub method: String,
    pub amount: String,
    pub args: Vec<ContractArgument>,
    pub max_fee: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Sent through the node; carries the node's transaction hash.
    Rpc {
        request: ContractCallRequest,
        tx_hash: Option<String>,
    },
    /// Hex transaction for a wallet to sign and broadcast, or already signed locally.
    RawTransaction { hex: String, signed: bool },
}

pub struct PostSubmitter {
    rpc: Arc<dyn LedgerRpc>,
    contract_address: String,
    make_post_method: String,
    use_rpc: bool,
    private_key: Option<Vec<u8>>,
}

impl PostSubmitter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, contract_address: &str, make_post_method: &str, use_rpc: bool) -> Self {
        Self {
            rpc,
            contract_address: contract_address.to_string(),
            make_post_method: make_post_method.to_string(),
            use_rpc,
            private_key: None,
        }
    }

    /// Sign raw transactions locally with this key.
    pub fn with_private_key(mut self, key: Vec<u8>) -> Self {
        self.private_key = Some(key);
        self
    }

    pub async fn submit(
        &self,
        from: &str,
        message: &str,
        reply_to_post_id: Option<&str>,
    ) -> Result<Submission, SubmitError> {
        if message.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        let args = make_post_args(message, reply_to_post_id);
        let attachment = make_post_attachment(&self.make_post_method, &args)?;
        let estimate = estimate_max_fee(self.rpc.as_ref(), from, &self.contract_address, &attachment).await;
        let max_fee = calculate_max_fee(&estimate, message.chars().count());

        if self.use_rpc {
            let request = ContractCallRequest {
                from: from.to_string(),
                contract: self.contract_address.clone(),
                method: self.make_post_method.clone(),
                amount: POST_AMOUNT_DNA.to_string(),
                args,
                max_fee: max_fee.dna,
            };
            let params = serde_json::to_value([&request]).map_err(|e| SubmitError::Rejected {
                method: "contract_call".into(),
                reason: e.to_string(),
            })?;
            let result = self.rpc.call("contract_call", params).await?;
            let tx_hash = result.as_str().map(str::to_string);
            tracing::info!(tx = ?tx_hash, "post submitted through node");
            return Ok(Submission::Rpc { request, tx_hash });
        }

        let balance = rpc::balance(self.rpc.as_ref(), from).await?;
        let nonce = balance.nonce.checked_add(1).ok_or_else(|| SubmitError::NonceOverflow {
            address: from.to_string(),
        })?;
        let epoch = rpc::epoch(self.rpc.as_ref()).await?;
        let to = hex_to_bytes(&self.contract_address)?;
        let to = <[u8; 20]>::try_from(to.as_slice())
            .map_err(|_| CodecError::Malformed(format!("contract address {}", self.contract_address)))?;

        let mut tx = Transaction::default();
        tx.tx_type = TransactionType::CallContract;
        tx.to = Some(to);
        tx.amount = float_string_to_dna(POST_AMOUNT_DNA)?;
        tx.nonce = nonce;
        tx.epoch = epoch.epoch;
        tx.max_fee = max_fee.atomic;
        tx.payload = attachment.to_bytes();
        if let Some(key) = &self.private_key {
            tx.sign(key)?;
        }
        Ok(Submission::RawTransaction {
            hex: tx.to_hex(true),
            signed: tx.is_signed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::arguments_from_bytes;

    #[test]
    fn post_args_json() {
        let args = make_post_args("hello", None);
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].format, ArgumentFormat::String);
        assert_eq!(args[0].value.as_deref(), Some(r#"{"message":"hello"}"#));

        let args = make_post_args("hi", Some("42"));
        let v: Value = serde_json::from_str(args[0].value.as_deref().unwrap()).unwrap();
        assert_eq!(v["replyToPostId"], "42");
        assert_eq!(v["message"], "hi");
    }

    #[test]
    fn attachment_carries_args() {
        let args = make_post_args("hello", Some("7"));
        let attachment = make_post_attachment("makePost", &args).unwrap();
        assert_eq!(attachment.method, "makePost");
        let decoded = arguments_from_bytes(&[ArgumentFormat::String], &attachment.args).unwrap();
        assert_eq!(decoded[0].value, args[0].value);
    }

    #[test]
    fn max_fee_scaling() {
        // 0.01 DNA estimate, 100-char post: (0.01 + 0.01 / 200 * 100) * 10 = 0.15
        let estimate = float_string_to_dna("0.01").unwrap();
        let fee = calculate_max_fee(&estimate, 100);
        assert_eq!(fee.dna, "0.15");
        assert_eq!(fee.atomic, float_string_to_dna("0.15").unwrap());

        let zero = calculate_max_fee(&BigUint::default(), 50);
        assert_eq!(zero.dna, "0");
    }

    #[test]
    fn contract_call_request_shape() {
        let request = ContractCallRequest {
            from: "0xa".into(),
            contract: "0xc".into(),
            method: "makePost".into(),
            amount: POST_AMOUNT_DNA.into(),
            args: make_post_args("x", None),
            max_fee: "0.1".into(),
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["maxFee"], "0.1");
        assert_eq!(v["args"][0]["format"], "string");
        assert_eq!(v["args"][0]["index"], 0);
    }
}
