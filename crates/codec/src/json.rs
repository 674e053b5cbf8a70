//! Node JSON representation of a transaction (`bcn_transaction` style responses).

use crate::error::CodecError;
use crate::hexutil::{float_string_to_dna, hex_to_bytes};
use crate::transaction::{Transaction, TransactionType};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonTransaction {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub from: String,
    pub to: Option<String>,
    pub amount: String,
    pub tips: String,
    pub max_fee: String,
    pub nonce: u32,
    pub epoch: u32,
    pub payload: Option<String>,
    pub block_hash: Option<String>,
    pub used_fee: Option<String>,
    pub timestamp: u64,
}

fn dna_field(value: &str) -> Result<BigUint, CodecError> {
    if value.is_empty() {
        Ok(BigUint::default())
    } else {
        float_string_to_dna(value)
    }
}

impl Transaction {
    /// Rebuild the wire transaction from its JSON form. The result is unsigned.
    pub fn from_json(json: &JsonTransaction) -> Result<Self, CodecError> {
        let to = match json.to.as_deref() {
            None | Some("") => None,
            Some(hex) => {
                let bytes = hex_to_bytes(hex)?;
                let address = <[u8; 20]>::try_from(bytes.as_slice()).map_err(|_| {
                    CodecError::malformed(format!("recipient must be 20 bytes, got {}", bytes.len()))
                })?;
                Some(address)
            }
        };
        let payload = match json.payload.as_deref() {
            None | Some("") => Vec::new(),
            Some(hex) => hex_to_bytes(hex)?,
        };
        Ok(Transaction {
            nonce: json.nonce,
            epoch: json.epoch,
            tx_type: TransactionType::from_json_name(&json.tx_type),
            to,
            amount: dna_field(&json.amount)?,
            max_fee: dna_field(&json.max_fee)?,
            tips: dna_field(&json.tips)?,
            payload,
            ..Default::default()
        })
    }
}
