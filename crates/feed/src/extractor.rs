//! Event extractor: one transaction hash in, zero or one post event out.

use crate::engine::{Batch, PostEvent, Poster};
use crate::error::ScanError;
use crate::rpc::{self, LedgerRpc};
use crate::sanitize::sanitize;
use crate::types::TxReceipt;
use codec::hexutil::{hex_to_bytes, hex_to_decimal};
use codec::utf8::utf8_to_string;
use std::collections::HashSet;

/// Blocks below this height carry the reply id as hex-wrapped decimal text; from this height
/// on the reply id is the plain string.
pub const REPLY_ID_FORMAT_BREAKPOINT: u64 = 10_200_492;

/// A transaction to inspect, with the block it was included in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRef {
    pub hash: String,
    pub block_height: u64,
    pub timestamp: u64,
}

/// Filters a transaction must pass to count as a post.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub contract_address: String,
    pub make_post_method: String,
    pub channel: String,
}

impl PostFilter {
    pub fn new(contract_address: &str, make_post_method: &str, channel: &str) -> Self {
        Self {
            contract_address: contract_address.to_lowercase(),
            make_post_method: make_post_method.to_string(),
            channel: channel.to_string(),
        }
    }
}

pub struct Extractor<'a> {
    rpc: &'a dyn LedgerRpc,
    filter: &'a PostFilter,
}

fn utf8_arg(hex: &str) -> Result<String, ScanError> {
    Ok(utf8_to_string(&hex_to_bytes(hex)?))
}

impl<'a> Extractor<'a> {
    pub fn new(rpc: &'a dyn LedgerRpc, filter: &'a PostFilter) -> Self {
        Self { rpc, filter }
    }

    /// Decode a post from an already fetched receipt. `Ok(None)` means the receipt is not
    /// a post for this feed; `Err(Malformed)` means its arguments do not decode.
    pub fn decode_receipt(&self, tx: &TxRef, receipt: &TxReceipt) -> Result<Option<PostEvent>, ScanError> {
        if receipt.contract.to_lowercase() != self.filter.contract_address
            || receipt.method != self.filter.make_post_method
            || !receipt.success
        {
            return Ok(None);
        }
        let Some(args) = receipt.events.first().map(|e| &e.args) else {
            return Ok(None);
        };
        if args.len() < 4 {
            return Ok(None);
        }

        let channel = utf8_arg(&args[2])?;
        if channel != self.filter.channel {
            return Ok(None);
        }
        let message = sanitize(&utf8_arg(&args[3])?);
        if message.is_empty() {
            return Ok(None);
        }
        let post_id = hex_to_decimal(&args[1])?;
        let reply_to_post_id = match args.get(4) {
            None => None,
            Some(raw) => {
                let text = utf8_arg(raw)?;
                if text.is_empty() {
                    None
                } else if tx.block_height < REPLY_ID_FORMAT_BREAKPOINT {
                    Some(hex_to_decimal(&text)?)
                } else {
                    Some(text)
                }
            }
        };

        Ok(Some(PostEvent {
            post_id,
            poster: args[0].clone(),
            message,
            block_height: tx.block_height,
            timestamp: tx.timestamp,
            transaction: tx.hash.clone(),
            reply_to_post_id,
        }))
    }

    /// Fetch the receipt of `tx` and decode it.
    pub async fn extract(&self, tx: &TxRef) -> Result<Option<PostEvent>, ScanError> {
        let Some(receipt) = rpc::tx_receipt(self.rpc, &tx.hash).await? else {
            return Ok(None);
        };
        self.decode_receipt(tx, &receipt)
    }

    /// Extract every transaction of one block or page into a batch, fetching identities of
    /// posters not in `known_posters`. Malformed transactions are skipped; any transport
    /// failure fails the whole batch so the caller can retry it.
    pub async fn extract_batch(&self, txs: &[TxRef], known_posters: &HashSet<String>) -> Result<Batch, ScanError> {
        let mut batch = Batch::default();
        let mut seen: HashSet<String> = HashSet::new();

        for tx in txs {
            let event = match self.extract(tx).await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(ScanError::Malformed(reason)) => {
                    tracing::debug!(tx = %tx.hash, height = tx.block_height, reason = %reason, "skipping malformed transaction");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !known_posters.contains(&event.poster) && seen.insert(event.poster.clone()) {
                batch.posters.push(self.fetch_poster(&event.poster).await?);
            }
            batch.events.push(event);
        }
        Ok(batch)
    }

    async fn fetch_poster(&self, address: &str) -> Result<Poster, ScanError> {
        match rpc::identity(self.rpc, address).await {
            Ok(Some(identity)) => Ok(Poster::from_identity(address, identity)),
            Ok(None) => Ok(Poster::unknown(address)),
            Err(e) => match ScanError::from(e) {
                ScanError::Malformed(reason) => {
                    tracing::debug!(address, reason = %reason, "identity undecodable, keeping address only");
                    Ok(Poster::unknown(address))
                }
                other => Err(other),
            },
        }
    }
}
