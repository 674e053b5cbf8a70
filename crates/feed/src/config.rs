//! Feed configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Post contract deployment on mainnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x8d318630eB62A032d2f8073d74f05cbF7c6C87Ae";
/// Block the post contract was deployed in; the backward scan stops here.
pub const DEFAULT_FIRST_BLOCK: u64 = 10_135_621;
pub const DEFAULT_MAKE_POST_METHOD: &str = "makePost";

/// Feed configuration. Every field has a default, so a JSON file only needs the overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Node JSON-RPC URL.
    pub rpc_url: String,
    /// Node API key, sent as `key` in every request body.
    pub api_key: String,
    /// Post contract address (as the node prints it; compared case-insensitively).
    pub contract_address: String,
    pub make_post_method: String,
    /// Channel tag posts must carry; empty for the main feed.
    pub channel: String,
    pub first_block: u64,
    /// Forward-scan tick period.
    pub polling_interval_ms: u64,
    /// Backward-scan tick period.
    pub scanning_interval_ms: u64,
    /// Wall-clock budget of one backfill activation.
    pub scan_posts_ttl_secs: u64,
    /// Per-request HTTP timeout of the adapters.
    pub request_timeout_secs: u64,
    pub backfill: BackfillConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:9009".to_string(),
            api_key: String::new(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            make_post_method: DEFAULT_MAKE_POST_METHOD.to_string(),
            channel: String::new(),
            first_block: DEFAULT_FIRST_BLOCK,
            polling_interval_ms: 5_000,
            scanning_interval_ms: 10,
            scan_posts_ttl_secs: 30,
            request_timeout_secs: 30,
            backfill: BackfillConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn scanning_interval(&self) -> Duration {
        Duration::from_millis(self.scanning_interval_ms)
    }

    pub fn scan_posts_ttl(&self) -> Duration {
        Duration::from_secs(self.scan_posts_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where the backward scan gets historical transactions from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BackfillConfig {
    /// Walk blocks one at a time through the node, optionally skipping ahead with a
    /// block index helper.
    Direct {
        #[serde(default)]
        block_index_url: Option<String>,
    },
    /// Page through the contract's transactions on an indexer API.
    Indexer {
        #[serde(default = "default_indexer_url")]
        indexer_url: String,
        #[serde(default = "default_page_limit")]
        page_limit: u32,
    },
}

impl Default for BackfillConfig {
    fn default() -> Self {
        BackfillConfig::Direct {
            block_index_url: None,
        }
    }
}

fn default_indexer_url() -> String {
    "https://api.idena.io/api".to_string()
}

fn default_page_limit() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = FeedConfig::default();
        assert_eq!(c.first_block, 10_135_621);
        assert_eq!(c.polling_interval(), Duration::from_secs(5));
        assert_eq!(c.scanning_interval(), Duration::from_millis(10));
        assert_eq!(c.scan_posts_ttl(), Duration::from_secs(30));
        assert_eq!(c.make_post_method, "makePost");
        assert!(c.channel.is_empty());
        assert_eq!(c.backfill, BackfillConfig::Direct { block_index_url: None });
    }

    #[test]
    fn partial_json_overrides() {
        let c: FeedConfig = serde_json::from_str(
            r#"{"rpc_url": "http://node:9009", "backfill": {"source": "indexer", "page_limit": 20}}"#,
        )
        .unwrap();
        assert_eq!(c.rpc_url, "http://node:9009");
        assert_eq!(c.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(
            c.backfill,
            BackfillConfig::Indexer {
                indexer_url: "https://api.idena.io/api".into(),
                page_limit: 20
            }
        );
    }

    #[test]
    fn missing_file_has_context() {
        let err = FeedConfig::from_json_file("/nonexistent/feed.json").unwrap_err();
        assert!(err.to_string().contains("read config"));
    }
}
