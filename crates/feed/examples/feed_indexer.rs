//! Example: follow the post contract and print every merged batch.
//!
//! Usage:
//!
//!   cargo run -p feed --example feed_indexer -- --rpc-url http://localhost:9009 --api-key <KEY>
//!   cargo run -p feed --example feed_indexer -- --config feed.json --indexer-url https://api.idena.io/api
//!
//! Set RUST_LOG=feed=debug to see scan decisions.

use anyhow::Result;
use feed::{BackfillConfig, FeedConfig, FeedIndexer, FeedUpdate, ScanDirection};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: feed_indexer [--config <FILE>] [--rpc-url <URL>] [--api-key <KEY>] \
                     [--indexer-url <URL> | --block-index-url <URL>]";

fn print_update(update: &FeedUpdate) {
    let direction = match update.direction {
        ScanDirection::Forward => "forward",
        ScanDirection::Backward => "backward",
    };
    println!(
        "{direction} block={} roots={:?} replies={:?} orphaned={:?} rejected={} duplicates={}",
        update.block_height.map_or_else(|| "-".to_string(), |h| h.to_string()),
        update.outcome.roots,
        update.outcome.rooted_replies,
        update.outcome.orphaned,
        update.outcome.rejected,
        update.outcome.duplicates,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("feed=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut rpc_url = None;
    let mut api_key = None;
    let mut indexer_url = None;
    let mut block_index_url = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = args.get(i).cloned();
            }
            "--rpc-url" => {
                i += 1;
                rpc_url = args.get(i).cloned();
            }
            "--api-key" => {
                i += 1;
                api_key = args.get(i).cloned();
            }
            "--indexer-url" => {
                i += 1;
                indexer_url = args.get(i).cloned();
            }
            "--block-index-url" => {
                i += 1;
                block_index_url = args.get(i).cloned();
            }
            "--help" | "-h" => {
                eprintln!("{USAGE}\nPrints every batch merged into the feed until Ctrl-C.");
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument {other}\n{USAGE}");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => FeedConfig::from_json_file(path)?,
        None => FeedConfig::default(),
    };
    if let Some(url) = rpc_url {
        config.rpc_url = url;
    }
    if let Some(key) = api_key {
        config.api_key = key;
    }
    if let Some(url) = indexer_url {
        config.backfill = BackfillConfig::Indexer {
            indexer_url: url,
            page_limit: 50,
        };
    } else if let Some(url) = block_index_url {
        config.backfill = BackfillConfig::Direct {
            block_index_url: Some(url),
        };
    }

    let indexer = Arc::new(FeedIndexer::from_config(config)?);
    let mut updates = indexer.subscribe();
    let token = indexer.cancellation_token();
    let runner = tokio::spawn(Arc::clone(&indexer).run());

    loop {
        tokio::select! {
            Ok(update) = updates.recv() => print_update(&update),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    token.cancel();
    runner.await?;

    let stats = indexer.engine().read().await.stats();
    println!(
        "posts={} roots={} orphans={} posters={} rejected={}",
        stats.posts, stats.roots, stats.orphans, stats.posters, stats.causality_rejections
    );
    Ok(())
}
