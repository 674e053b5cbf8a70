//! FeedIndexer: forward tip-following and time-boxed backward backfill feeding one engine.
//!
//! Each direction owns its cursor behind its own lock, so a loop never overlaps itself
//! while the two directions run concurrently. A tick extracts without holding the engine
//! lock, then merges and commits its cursor together; cancelling during any adapter call
//! leaves the cursor at the last committed block.

use crate::config::FeedConfig;
use crate::cursor::ScanCursor;
use crate::engine::{Batch, FeedEngine, MergeOutcome, ScanDirection};
use crate::error::{RpcError, ScanError};
use crate::extractor::{Extractor, PostFilter, TxRef};
use crate::rpc::{self, HttpRpcClient, LedgerRpc};
use crate::source::{BackfillSource, ScanBounds};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OnceCell, RwLock};
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Sent to subscribers after every merged batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    pub direction: ScanDirection,
    /// Block committed by this batch (lowest block of the page for indexer pages).
    pub block_height: Option<u64>,
    pub outcome: MergeOutcome,
}

/// How one backfill activation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub batches: usize,
    pub no_more_history: bool,
}

pub struct FeedIndexer {
    config: FeedConfig,
    filter: PostFilter,
    rpc: Arc<dyn LedgerRpc>,
    source: BackfillSource,
    engine: Arc<RwLock<FeedEngine>>,
    forward: Mutex<ScanCursor>,
    backward: Mutex<ScanCursor>,
    initial_block: OnceCell<u64>,
    no_more_history: AtomicBool,
    update_tx: broadcast::Sender<FeedUpdate>,
    cancel: CancellationToken,
}

impl FeedIndexer {
    pub fn new(config: FeedConfig, rpc: Arc<dyn LedgerRpc>, source: BackfillSource) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        let filter = PostFilter::new(&config.contract_address, &config.make_post_method, &config.channel);
        Self {
            config,
            filter,
            rpc,
            source,
            engine: Arc::new(RwLock::new(FeedEngine::new())),
            forward: Mutex::new(ScanCursor::default()),
            backward: Mutex::new(ScanCursor::default()),
            initial_block: OnceCell::new(),
            no_more_history: AtomicBool::new(false),
            update_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Indexer over the HTTP adapters named in `config`.
    pub fn from_config(config: FeedConfig) -> Result<Self, RpcError> {
        let timeout = config.request_timeout();
        let rpc = Arc::new(HttpRpcClient::new(&config.rpc_url, &config.api_key, timeout)?);
        let source = BackfillSource::from_config(&config.backfill, timeout)?;
        Ok(Self::new(config, rpc, source))
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn engine(&self) -> Arc<RwLock<FeedEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedUpdate> {
        self.update_tx.subscribe()
    }

    /// Token that stops both loops at their next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn no_more_history(&self) -> bool {
        self.no_more_history.load(Ordering::SeqCst)
    }

    pub async fn forward_cursor(&self) -> ScanCursor {
        self.forward.lock().await.clone()
    }

    pub async fn backward_cursor(&self) -> ScanCursor {
        self.backward.lock().await.clone()
    }

    /// Chain tip at startup, read once.
    pub async fn initial_block(&self) -> Result<u64, ScanError> {
        let tip = self
            .initial_block
            .get_or_try_init(|| async {
                let tip = rpc::last_block(self.rpc.as_ref()).await?;
                tracing::info!(tip, "initial block");
                Ok::<_, RpcError>(tip)
            })
            .await?;
        Ok(*tip)
    }

    async fn extract(&self, txs: &[TxRef]) -> Result<Batch, ScanError> {
        let known = self.engine.read().await.poster_addresses();
        Extractor::new(self.rpc.as_ref(), &self.filter)
            .extract_batch(txs, &known)
            .await
    }

    /// One forward step. `Ok(None)` when the block had no transactions or could not be decoded.
    pub async fn forward_tick(&self) -> Result<Option<MergeOutcome>, ScanError> {
        let tip = self.initial_block().await?;
        let mut cursor = self.forward.lock().await;
        let target = cursor.forward_target(tip);

        let block = match rpc::block_at(self.rpc.as_ref(), target).await {
            Ok(Some(block)) => block,
            Ok(None) => return Err(ScanError::NotFound(format!("block {target}"))),
            Err(e @ RpcError::Decode { .. }) => {
                tracing::warn!(height = target, reason = %e, "skipping undecodable block");
                cursor.commit(target);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if block.transactions.is_empty() {
            cursor.commit(target);
            return Ok(None);
        }

        let txs: Vec<TxRef> = block
            .transactions
            .iter()
            .map(|hash| TxRef {
                hash: hash.clone(),
                block_height: block.height,
                timestamp: block.timestamp,
            })
            .collect();
        let batch = self.extract(&txs).await?;

        let outcome = {
            let mut engine = self.engine.write().await;
            let outcome = engine.merge(batch, ScanDirection::Forward);
            cursor.commit(target);
            outcome
        };
        tracing::debug!(height = target, roots = outcome.roots.len(), replies = outcome.rooted_replies.len(), "forward block merged");
        let _ = self.update_tx.send(FeedUpdate {
            direction: ScanDirection::Forward,
            block_height: Some(target),
            outcome: outcome.clone(),
        });
        Ok(Some(outcome))
    }

    /// One backward step. `Err(Exhausted)` once the source has no more history; the flag is
    /// then permanent and later calls return without touching the network.
    pub async fn backward_tick(&self) -> Result<Option<MergeOutcome>, ScanError> {
        if self.no_more_history() {
            return Err(ScanError::Exhausted);
        }
        let bounds = ScanBounds {
            initial_block: self.initial_block().await?,
            first_block: self.config.first_block,
        };
        let mut cursor = self.backward.lock().await;

        let next = self
            .source
            .next_batch(
                self.rpc.as_ref(),
                &cursor,
                bounds,
                &self.config.contract_address,
                &self.config.make_post_method,
            )
            .await;
        let step = match next {
            Ok(step) => step,
            Err(ScanError::Exhausted) => {
                self.mark_exhausted(&mut cursor);
                return Err(ScanError::Exhausted);
            }
            Err(e) => return Err(e),
        };

        let result = if step.transactions.is_empty() {
            *cursor = step.next_cursor;
            None
        } else {
            let batch = self.extract(&step.transactions).await?;
            let outcome = {
                let mut engine = self.engine.write().await;
                let outcome = engine.merge(batch, ScanDirection::Backward);
                *cursor = step.next_cursor;
                outcome
            };
            let _ = self.update_tx.send(FeedUpdate {
                direction: ScanDirection::Backward,
                block_height: cursor.last_captured_block_height,
                outcome: outcome.clone(),
            });
            Some(outcome)
        };

        if cursor.exhausted {
            self.mark_exhausted(&mut cursor);
        }
        Ok(result)
    }

    fn mark_exhausted(&self, cursor: &mut ScanCursor) {
        cursor.exhausted = true;
        if !self.no_more_history.swap(true, Ordering::SeqCst) {
            tracing::info!(source = self.source.name(), last = ?cursor.last_captured_block_height, "no more history");
        }
    }

    /// Sleep for `period`; false when cancelled first.
    async fn pause(&self, period: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(period) => true,
        }
    }

    /// Follow the tip until cancelled. Failures retry the same height after the interval.
    pub async fn run_forward(self: Arc<Self>) {
        while self.pause(self.config.polling_interval()).await {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = self.forward_tick() => r,
            };
            if let Err(e) = result {
                match e {
                    ScanError::NotFound(_) => tracing::trace!(reason = %e, "forward block not yet available"),
                    _ => {
                        tracing::warn!(reason = %e, "forward tick failed, retrying");
                        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..500));
                        if !self.pause(jitter).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One time-boxed backfill activation. Returns early on cancellation or exhaustion.
    pub async fn backfill_session(self: Arc<Self>) -> BackfillReport {
        let mut report = BackfillReport {
            batches: 0,
            no_more_history: self.no_more_history(),
        };
        if report.no_more_history {
            return report;
        }
        let deadline = Instant::now() + self.config.scan_posts_ttl();

        while Instant::now() < deadline && self.pause(self.config.scanning_interval()).await {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = self.backward_tick() => r,
            };
            match result {
                Ok(Some(_)) => report.batches += 1,
                Ok(None) => {}
                Err(ScanError::Exhausted) => break,
                Err(e) => tracing::debug!(reason = %e, "backward tick failed, rescheduling"),
            }
        }
        report.no_more_history = self.no_more_history();
        report
    }

    /// Run the forward loop and one backfill activation concurrently until cancelled.
    pub async fn run(self: Arc<Self>) {
        loop {
            match self.initial_block().await {
                Ok(_) => break,
                Err(e) => {
                    tracing::warn!(reason = %e, "reading chain tip failed, retrying");
                    if !self.pause(self.config.polling_interval()).await {
                        return;
                    }
                }
            }
        }
        let forward = tokio::spawn(Arc::clone(&self).run_forward());
        let report = Arc::clone(&self).backfill_session().await;
        tracing::info!(batches = report.batches, no_more_history = report.no_more_history, "backfill activation finished");
        let _ = forward.await;
    }
}
