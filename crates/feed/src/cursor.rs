//! In-memory scan cursors (no disk persistence).
//!
//! A cursor only moves when a batch has been merged; a restart re-derives the next target
//! from the last committed height.

use crate::history::PastBlocks;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCursor {
    /// Last block whose transactions were fully merged. `None` before the first commit.
    pub last_captured_block_height: Option<u64>,
    /// Backward indexer source: lowest block of the last page, which may continue on the next
    /// page. Items above it on later pages are skipped; it is committed once a page passes it.
    pub partial_block_height: Option<u64>,
    /// Backward indexer source: token for the next page.
    pub continuation_token: Option<String>,
    /// Backward direct source: last block index helper reply.
    pub past_blocks: PastBlocks,
    /// The source has no more history.
    pub exhausted: bool,
}

impl ScanCursor {
    pub fn new(last_captured_block_height: u64) -> Self {
        Self {
            last_captured_block_height: Some(last_captured_block_height),
            ..Default::default()
        }
    }

    /// Next block for the forward scan: one past the last capture, or the tip itself.
    pub fn forward_target(&self, tip: u64) -> u64 {
        self.last_captured_block_height.map_or(tip, |h| h + 1)
    }

    pub fn commit(&mut self, height: u64) {
        self.last_captured_block_height = Some(height);
    }
}
