//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use async_trait::async_trait;
use feed::history::{ContractIndexer, IndexerItem, IndexerPage, IndexerReceipt};
use feed::{BackfillConfig, FeedConfig, RpcError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const CONTRACT: &str = "0x8d318630eB62A032d2f8073d74f05cbF7c6C87Ae";
/// Above the reply id format breakpoint, so reply ids are plain strings.
pub const TIP: u64 = 10_300_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("feed=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

pub fn config(first_block: u64) -> FeedConfig {
    FeedConfig {
        contract_address: CONTRACT.to_string(),
        first_block,
        backfill: BackfillConfig::Direct {
            block_index_url: None,
        },
        ..FeedConfig::default()
    }
}

/// Little-endian, trailing zero bytes trimmed, as the contract stores counters.
pub fn id_hex(id: u64) -> String {
    let bytes = id.to_le_bytes();
    let end = bytes.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
    format!("0x{}", hex::encode(&bytes[..end]))
}

pub fn text_hex(s: &str) -> String {
    format!("0x{}", hex::encode(s.as_bytes()))
}

pub fn poster_of(id: u64) -> String {
    format!("0x{:040x}", id % 3 + 1)
}

/// `bcn_txReceipt` result for a post made through the contract.
pub fn post_receipt(id: u64, message: &str, reply_to: Option<u64>) -> Value {
    let reply = reply_to.map(|r| text_hex(&r.to_string())).unwrap_or_else(|| "0x".to_string());
    json!({
        "contract": CONTRACT.to_lowercase(),
        "method": "makePost",
        "success": true,
        "events": [{
            "event": "makePost",
            "args": [poster_of(id), id_hex(id), "0x", text_hex(message), reply]
        }]
    })
}

pub fn tx_hash(id: u64) -> String {
    format!("0x{:064x}", id)
}

#[derive(Default)]
struct LedgerState {
    tip: u64,
    blocks: HashMap<u64, Vec<String>>,
    raw_blocks: HashMap<u64, Value>,
    receipts: HashMap<String, Value>,
    failures: HashMap<String, usize>,
    calls: Vec<(String, Value)>,
}

/// In-memory node: blocks, receipts and identities, with call recording and injected
/// transport failures.
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(tip: u64) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                tip,
                ..Default::default()
            }),
        }
    }

    /// Block at `height` with no transactions (`transactions: null`).
    pub fn add_empty_block(&self, height: u64) {
        self.state.lock().unwrap().blocks.entry(height).or_default();
    }

    /// Serve `block` verbatim as the `bcn_blockAt` result for `height`.
    pub fn add_raw_block(&self, height: u64, block: Value) {
        self.state.lock().unwrap().raw_blocks.insert(height, block);
    }

    /// Post `id` included in block `height`.
    pub fn add_post(&self, height: u64, id: u64, reply_to: Option<u64>) {
        self.add_receipt(height, &tx_hash(id), post_receipt(id, &format!("post {id}"), reply_to));
    }

    pub fn add_receipt(&self, height: u64, hash: &str, receipt: Value) {
        let mut s = self.state.lock().unwrap();
        s.blocks.entry(height).or_default().push(hash.to_string());
        s.receipts.insert(hash.to_string(), receipt);
    }

    /// Receipt reachable by hash without a block (for indexer-sourced scans).
    pub fn add_loose_receipt(&self, hash: &str, receipt: Value) {
        self.state.lock().unwrap().receipts.insert(hash.to_string(), receipt);
    }

    /// Fail the next `times` calls of `method` with a transport error.
    pub fn fail_next(&self, method: &str, times: usize) {
        self.state.lock().unwrap().failures.insert(method.to_string(), times);
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_of(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn blocks_requested(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == "bcn_blockAt")
            .filter_map(|(_, p)| p[0].as_u64())
            .collect()
    }
}

#[async_trait]
impl feed::LedgerRpc for MockLedger {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push((method.to_string(), params.clone()));
        if let Some(left) = s.failures.get_mut(method) {
            if *left > 0 {
                *left -= 1;
                return Err(RpcError::Transport(format!("{method}: injected failure")));
            }
        }
        let result = match method {
            "bcn_lastBlock" => json!({ "height": s.tip }),
            "bcn_blockAt" => {
                let height = params[0].as_u64().unwrap_or_default();
                if let Some(raw) = s.raw_blocks.get(&height) {
                    return Ok(raw.clone());
                }
                match s.blocks.get(&height) {
                    Some(txs) if txs.is_empty() => {
                        json!({ "height": height, "timestamp": height * 20, "transactions": null })
                    }
                    Some(txs) => json!({ "height": height, "timestamp": height * 20, "transactions": txs }),
                    None => Value::Null,
                }
            }
            "bcn_txReceipt" => {
                let hash = params[0].as_str().unwrap_or_default();
                s.receipts.get(hash).cloned().unwrap_or(Value::Null)
            }
            "dna_identity" => {
                let address = params[0].as_str().unwrap_or_default();
                json!({
                    "address": address, "stake": "100.5", "age": 12,
                    "pubkey": "0x04", "state": "Human", "online": false
                })
            }
            _ => Value::Null,
        };
        Ok(result)
    }
}

/// Indexer serving a fixed sequence of pages; records every query's token.
pub struct MockIndexer {
    pages: Mutex<VecDeque<IndexerPage>>,
    pub queries: Mutex<Vec<Option<String>>>,
}

impl MockIndexer {
    pub fn new(pages: Vec<IndexerPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl ContractIndexer for MockIndexer {
    async fn query(
        &self,
        _contract: &str,
        _limit: u32,
        continuation_token: Option<&str>,
    ) -> Result<IndexerPage, RpcError> {
        self.queries
            .lock()
            .unwrap()
            .push(continuation_token.map(str::to_string));
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }
}

pub fn indexer_item(id: u64, height: u64) -> IndexerItem {
    IndexerItem {
        hash: tx_hash(id),
        tx_type: "CallContract".to_string(),
        block_height: height,
        timestamp: height * 20,
        tx_receipt: Some(IndexerReceipt {
            success: true,
            method: "makePost".to_string(),
        }),
    }
}
