//! Off-chain social feed runtime: tip-following, historical backfill and reply-tree
//! reconciliation for the post contract.
//!
//! - **FeedIndexer**: forward loop at the chain tip plus time-boxed backward activations,
//!   pulling from a [BackfillSource] (direct block walk or paginated indexer).
//! - **Extractor**: receipt filters and event decoding, one transaction at a time.
//! - **FeedEngine**: arena-backed post/reply tree with orphan promotion and causality
//!   rejection; batches are applied atomically.
//! - **PostSubmitter**: builds `makePost` calls for the node or a wallet.

pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod history;
pub mod indexer;
pub mod rpc;
pub mod sanitize;
pub mod source;
pub mod submit;
pub mod types;

pub use config::{BackfillConfig, FeedConfig};
pub use cursor::ScanCursor;
pub use engine::{
    Batch, DisplaySettings, Edge, EngineStats, FeedEngine, MergeOutcome, Post, PostEvent, Poster,
    ScanDirection,
};
pub use error::{RpcError, ScanError, SubmitError};
pub use extractor::{Extractor, PostFilter, TxRef, REPLY_ID_FORMAT_BREAKPOINT};
pub use history::{BlockIndex, ContractIndexer, IndexerItem, IndexerPage, PastBlocks};
pub use indexer::{BackfillReport, FeedIndexer, FeedUpdate};
pub use rpc::{HttpRpcClient, LedgerRpc};
pub use source::{BackfillBatch, BackfillSource, ScanBounds};
pub use submit::{ContractCallRequest, PostSubmitter, Submission};
