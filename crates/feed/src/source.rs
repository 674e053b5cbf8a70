//! Backfill sources for the backward scan.
//!
//! Both variants turn the committed backward cursor into `(transactions, next cursor)`;
//! the scheduler merges the transactions and only then installs the next cursor.

use crate::config::BackfillConfig;
use crate::cursor::ScanCursor;
use crate::error::{RpcError, ScanError};
use crate::extractor::TxRef;
use crate::history::{
    BlockIndex, ContractIndexer, HttpBlockIndex, HttpContractIndexer, IndexerItem, PastBlocks,
};
use crate::rpc::{self, LedgerRpc};
use std::sync::Arc;
use std::time::Duration;

pub enum BackfillSource {
    /// One block per tick through the node, optionally skipping ahead via a block index.
    Direct {
        block_index: Option<Arc<dyn BlockIndex>>,
    },
    /// One indexer page per tick.
    Indexer {
        indexer: Arc<dyn ContractIndexer>,
        page_limit: u32,
    },
}

/// Result of one backward step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillBatch {
    pub transactions: Vec<TxRef>,
    /// Cursor to commit once `transactions` are merged.
    pub next_cursor: ScanCursor,
}

/// What the backward scan needs to know about the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    /// Tip height read when the scan started.
    pub initial_block: u64,
    /// Blocks at or below this height are never scanned.
    pub first_block: u64,
}

impl BackfillSource {
    pub fn from_config(config: &BackfillConfig, timeout: Duration) -> Result<Self, RpcError> {
        Ok(match config {
            BackfillConfig::Direct { block_index_url } => BackfillSource::Direct {
                block_index: match block_index_url {
                    Some(url) => {
                        Some(Arc::new(HttpBlockIndex::new(url.clone(), timeout)?) as Arc<dyn BlockIndex>)
                    }
                    None => None,
                },
            },
            BackfillConfig::Indexer {
                indexer_url,
                page_limit,
            } => BackfillSource::Indexer {
                indexer: Arc::new(HttpContractIndexer::new(indexer_url.clone(), timeout)?),
                page_limit: *page_limit,
            },
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackfillSource::Direct { .. } => "direct",
            BackfillSource::Indexer { .. } => "indexer",
        }
    }

    /// Produce the next backward batch from the committed `cursor`.
    pub async fn next_batch(
        &self,
        rpc: &dyn LedgerRpc,
        cursor: &ScanCursor,
        bounds: ScanBounds,
        contract_address: &str,
        make_post_method: &str,
    ) -> Result<BackfillBatch, ScanError> {
        if cursor.exhausted {
            return Err(ScanError::Exhausted);
        }
        match self {
            BackfillSource::Direct { block_index } => {
                next_direct_batch(rpc, block_index.as_deref(), cursor, bounds).await
            }
            BackfillSource::Indexer {
                indexer,
                page_limit,
            } => {
                next_indexer_batch(
                    indexer.as_ref(),
                    *page_limit,
                    cursor,
                    contract_address,
                    make_post_method,
                )
                .await
            }
        }
    }
}

/// Pick the next block to read. Returns the block and, when the index helper was queried,
/// its reply for the next cursor.
pub async fn pending_block(
    block_index: Option<&dyn BlockIndex>,
    cursor: &ScanCursor,
    bounds: ScanBounds,
) -> Result<(u64, Option<PastBlocks>), ScanError> {
    let next = cursor
        .last_captured_block_height
        .filter(|h| *h > 0)
        .map(|h| h - 1);
    let mut fetched = None;

    let pending = match (next, block_index) {
        (None, _) => bounds.initial_block.saturating_sub(1),
        (Some(next), None) => next,
        (Some(next), Some(index)) => {
            let cached = &cursor.past_blocks;
            let lowest_listed = cached.blocks_with_transactions.last().copied();
            let above_next = cached.initial_block_number > next;
            let already_processed = above_next && lowest_listed.map_or(false, |b| b > next);
            let in_range = above_next && lowest_listed.map_or(false, |b| b < next);

            if cached.blocks_with_transactions.is_empty() || already_processed {
                let reply = index.query(next).await?;
                let Some(&first_listed) = reply.blocks_with_transactions.first() else {
                    return Err(ScanError::Exhausted);
                };
                let pending = if next > reply.initial_block_number {
                    next
                } else {
                    first_listed
                };
                fetched = Some(reply);
                pending
            } else if in_range {
                cached
                    .blocks_with_transactions
                    .iter()
                    .copied()
                    .find(|b| *b <= next)
                    .unwrap_or(next)
            } else {
                next
            }
        }
    };

    if pending <= bounds.first_block {
        return Err(ScanError::Exhausted);
    }
    Ok((pending, fetched))
}

async fn next_direct_batch(
    rpc: &dyn LedgerRpc,
    block_index: Option<&dyn BlockIndex>,
    cursor: &ScanCursor,
    bounds: ScanBounds,
) -> Result<BackfillBatch, ScanError> {
    let (pending, fetched) = pending_block(block_index, cursor, bounds).await?;
    let block = match rpc::block_at(rpc, pending).await {
        Ok(Some(block)) => Some(block),
        Ok(None) => return Err(ScanError::NotFound(format!("block {pending}"))),
        Err(e @ RpcError::Decode { .. }) => {
            tracing::warn!(height = pending, reason = %e, "skipping undecodable block");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let mut next_cursor = cursor.clone();
    next_cursor.commit(pending);
    if let Some(reply) = fetched {
        next_cursor.past_blocks = reply;
    }
    let transactions = block
        .map(|block| {
            block
                .transactions
                .into_iter()
                .map(|hash| TxRef {
                    hash,
                    block_height: block.height,
                    timestamp: block.timestamp,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(BackfillBatch {
        transactions,
        next_cursor,
    })
}

async fn next_indexer_batch(
    indexer: &dyn ContractIndexer,
    page_limit: u32,
    cursor: &ScanCursor,
    contract_address: &str,
    make_post_method: &str,
) -> Result<BackfillBatch, ScanError> {
    let page = indexer
        .query(contract_address, page_limit, cursor.continuation_token.as_deref())
        .await?;

    // Blocks above the partial one were fully captured by earlier pages.
    let items: Vec<IndexerItem> = page
        .result
        .into_iter()
        .filter(|item| cursor.partial_block_height.map_or(true, |p| item.block_height <= p))
        .collect();
    let heights = || items.iter().map(|i| i.block_height).filter(|h| *h > 0);

    let mut next_cursor = cursor.clone();
    match (page.continuation_token.is_some(), heights().min()) {
        (true, Some(lowest)) => {
            // The lowest block may continue on the next page.
            if let Some(complete) = heights().filter(|h| *h > lowest).min() {
                next_cursor.commit(complete);
            }
            next_cursor.partial_block_height = Some(lowest);
        }
        (true, None) => {}
        (false, lowest) => {
            if let Some(lowest) = lowest {
                next_cursor.commit(lowest);
            }
            next_cursor.partial_block_height = None;
        }
    }
    next_cursor.exhausted = page.continuation_token.is_none();
    next_cursor.continuation_token = page.continuation_token;

    let transactions = items
        .into_iter()
        .filter(|item| item.is_call_of(make_post_method))
        .map(|item| TxRef {
            hash: item.hash,
            block_height: item.block_height,
            timestamp: item.timestamp,
        })
        .collect();
    Ok(BackfillBatch {
        transactions,
        next_cursor,
    })
}
