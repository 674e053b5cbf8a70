//! Node response shapes.

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// `bcn_blockAt` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Block {
    pub height: u64,
    #[serde(default)]
    pub timestamp: u64,
    /// `null` on the wire for blocks without transactions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<String>,
}

/// `bcn_txReceipt` result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TxReceipt {
    #[serde(deserialize_with = "null_as_default")]
    pub contract: String,
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,
    pub success: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub events: Vec<TxEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TxEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub event: String,
    /// Hex-encoded event arguments.
    #[serde(deserialize_with = "null_as_default")]
    pub args: Vec<String>,
}

/// `dna_identity` result (only the fields the feed keeps).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Identity {
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stake: String,
    pub age: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub pubkey: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    pub online: bool,
}

/// `dna_getBalance` result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Balance {
    pub balance: String,
    pub stake: String,
    pub nonce: u32,
}

/// `dna_epoch` result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpochInfo {
    pub epoch: u32,
    pub next_validation: String,
    pub current_period: String,
}

/// `bcn_syncing` result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncStatus {
    pub syncing: bool,
    pub current_block: u64,
    pub highest_block: u64,
}
