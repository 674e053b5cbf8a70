//! Ledger access adapter: JSON-RPC over HTTP plus typed helpers for the methods the feed uses.

use crate::error::RpcError;
use crate::types::{Balance, Block, EpochInfo, Identity, SyncStatus, TxReceipt};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One request/response round trip with the node. `Ok(Value::Null)` means the node
/// answered with a null result (e.g. unknown block or receipt).
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// Reqwest client that does not use the system proxy.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, RpcError> {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .map_err(|e| RpcError::Transport(format!("build http client: {e}")))
}

/// Node RPC over HTTP. Every request carries the API key in the body as `key`.
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
            api_key: api_key.into(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl LedgerRpc for HttpRpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "key": self.api_key,
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?
            .error_for_status()
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?;
        let v: Value = resp
            .json()
            .await
            .map_err(|e| RpcError::Transport(format!("{method}: parse response: {e}")))?;
        if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Node {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            });
        }
        Ok(v.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn decode_optional<T: DeserializeOwned>(method: &str, value: Value) -> Result<Option<T>, RpcError> {
    if value.is_null() {
        return Ok(None);
    }
    decode(method, value).map(Some)
}

/// Chain tip height (`bcn_lastBlock`).
pub async fn last_block(rpc: &dyn LedgerRpc) -> Result<u64, RpcError> {
    let result = rpc.call("bcn_lastBlock", json!([])).await?;
    let height = result
        .get("height")
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::Decode {
            method: "bcn_lastBlock".into(),
            reason: "missing height".into(),
        })?;
    Ok(height)
}

/// Block by height (`bcn_blockAt`); `None` when the node does not have it yet.
pub async fn block_at(rpc: &dyn LedgerRpc, height: u64) -> Result<Option<Block>, RpcError> {
    let result = rpc.call("bcn_blockAt", json!([height])).await?;
    decode_optional("bcn_blockAt", result)
}

pub async fn tx_receipt(rpc: &dyn LedgerRpc, hash: &str) -> Result<Option<TxReceipt>, RpcError> {
    let result = rpc.call("bcn_txReceipt", json!([hash])).await?;
    decode_optional("bcn_txReceipt", result)
}

pub async fn identity(rpc: &dyn LedgerRpc, address: &str) -> Result<Option<Identity>, RpcError> {
    let result = rpc.call("dna_identity", json!([address])).await?;
    decode_optional("dna_identity", result)
}

pub async fn syncing(rpc: &dyn LedgerRpc) -> Result<SyncStatus, RpcError> {
    let result = rpc.call("bcn_syncing", json!([])).await?;
    decode("bcn_syncing", result)
}

/// Node's own address; `None` for view-only nodes.
pub async fn coinbase_address(rpc: &dyn LedgerRpc) -> Result<Option<String>, RpcError> {
    let result = rpc.call("dna_getCoinbaseAddr", json!([])).await?;
    Ok(result.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

pub async fn balance(rpc: &dyn LedgerRpc, address: &str) -> Result<Balance, RpcError> {
    let result = rpc.call("dna_getBalance", json!([address])).await?;
    decode("dna_getBalance", result)
}

pub async fn epoch(rpc: &dyn LedgerRpc) -> Result<EpochInfo, RpcError> {
    let result = rpc.call("dna_epoch", json!([])).await?;
    decode("dna_epoch", result)
}
