//! Historical data sources for backfill: the sparse block index helper and the paginated
//! contract indexer.

use crate::error::RpcError;
use crate::rpc::http_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Block index helper reply: blocks at or below `initial_block_number` known to carry
/// contract transactions, highest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PastBlocks {
    #[serde(alias = "initialblockNumber")]
    pub initial_block_number: u64,
    #[serde(alias = "blocksWithTxs")]
    pub blocks_with_transactions: Vec<u64>,
}

#[async_trait]
pub trait BlockIndex: Send + Sync {
    async fn query(&self, block_number: u64) -> Result<PastBlocks, RpcError>;
}

/// `GET {url}?blockNumber=N`.
pub struct HttpBlockIndex {
    client: reqwest::Client,
    url: String,
}

impl HttpBlockIndex {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl BlockIndex for HttpBlockIndex {
    async fn query(&self, block_number: u64) -> Result<PastBlocks, RpcError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("blockNumber", block_number)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RpcError::Transport(format!("block index: {e}")))?;
        resp.json().await.map_err(|e| RpcError::Decode {
            method: "block index".into(),
            reason: e.to_string(),
        })
    }
}

/// One page of contract activity from the indexer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexerPage {
    #[serde(deserialize_with = "nullable_vec")]
    pub result: Vec<IndexerItem>,
    pub continuation_token: Option<String>,
}

fn nullable_vec<'de, D>(d: D) -> Result<Vec<IndexerItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<IndexerItem>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexerItem {
    #[serde(alias = "txHash")]
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(alias = "height")]
    pub block_height: u64,
    /// Unix seconds.
    pub timestamp: u64,
    pub tx_receipt: Option<IndexerReceipt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexerReceipt {
    pub success: bool,
    pub method: String,
}

impl IndexerItem {
    /// Successful `CallContract` invoking `method`.
    pub fn is_call_of(&self, method: &str) -> bool {
        self.tx_type.eq_ignore_ascii_case("CallContract")
            && self
                .tx_receipt
                .as_ref()
                .map_or(false, |r| r.success && r.method == method)
    }
}

#[async_trait]
pub trait ContractIndexer: Send + Sync {
    async fn query(
        &self,
        contract: &str,
        limit: u32,
        continuation_token: Option<&str>,
    ) -> Result<IndexerPage, RpcError>;
}

/// `GET {base_url}/Contract/{contract}/BalanceUpdates?limit=N[&continuationToken=T]`.
pub struct HttpContractIndexer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContractIndexer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContractIndexer for HttpContractIndexer {
    async fn query(
        &self,
        contract: &str,
        limit: u32,
        continuation_token: Option<&str>,
    ) -> Result<IndexerPage, RpcError> {
        let url = format!("{}/Contract/{}/BalanceUpdates", self.base_url, contract);
        let mut req = self.client.get(&url).query(&[("limit", limit.to_string())]);
        if let Some(token) = continuation_token {
            req = req.query(&[("continuationToken", token)]);
        }
        let resp = req
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RpcError::Transport(format!("indexer: {e}")))?;
        resp.json().await.map_err(|e| RpcError::Decode {
            method: "indexer".into(),
            reason: e.to_string(),
        })
    }
}
