use feed::{Batch, Edge, FeedEngine, PostEvent, ScanDirection};
use proptest::prelude::*;

fn event(id: u64, height: u64, reply_to: Option<u64>) -> PostEvent {
    PostEvent {
        post_id: id.to_string(),
        poster: format!("0x{:040x}", id % 4),
        message: format!("post {id}"),
        block_height: height,
        timestamp: height * 20,
        transaction: format!("0x{id:064x}"),
        reply_to_post_id: reply_to.map(|r| r.to_string()),
    }
}

/// Three roots with nested replies, each reply strictly newer than its parent.
fn forest() -> Vec<PostEvent> {
    vec![
        event(1, 100, None),
        event(2, 101, Some(1)),
        event(3, 102, Some(1)),
        event(4, 103, Some(2)),
        event(5, 104, Some(4)),
        event(6, 110, None),
        event(7, 111, Some(6)),
        event(8, 112, Some(7)),
        event(9, 120, None),
        event(10, 121, Some(9)),
        event(11, 130, Some(10)),
    ]
}

fn single(e: PostEvent) -> Batch {
    Batch {
        events: vec![e],
        posters: Vec::new(),
    }
}

/// Every parent's ordered children plus the visible root order. All heights in [forest] are
/// distinct, so both are fully determined.
fn shape(engine: &FeedEngine) -> (Vec<Edge>, Vec<String>) {
    (engine.reply_edges(), engine.ordered_post_ids().to_vec())
}

fn reference() -> FeedEngine {
    let mut engine = FeedEngine::new();
    engine.merge(
        Batch {
            events: forest(),
            posters: Vec::new(),
        },
        ScanDirection::Forward,
    );
    engine
}

proptest! {
    #[test]
    fn arrival_order_does_not_change_the_tree(order in Just(forest()).prop_shuffle()) {
        let mut engine = FeedEngine::new();
        for e in order {
            engine.merge(single(e), ScanDirection::Backward);
        }
        let stats = engine.stats();
        prop_assert_eq!(stats.posts, 11);
        prop_assert_eq!(stats.orphans, 0);
        prop_assert_eq!(stats.roots, 3);
        prop_assert_eq!(stats.causality_rejections, 0);
        prop_assert!(engine.orphan_edges().is_empty());
        prop_assert_eq!(shape(&engine), shape(&reference()));
    }

    #[test]
    fn batch_boundaries_do_not_change_the_tree(
        order in Just(forest()).prop_shuffle(),
        cuts in proptest::collection::vec(1usize..11, 0..5),
    ) {
        let mut cuts = cuts;
        cuts.sort_unstable();
        cuts.dedup();
        let mut engine = FeedEngine::new();
        let mut start = 0;
        for end in cuts.into_iter().chain(std::iter::once(order.len())) {
            engine.merge(
                Batch { events: order[start..end].to_vec(), posters: Vec::new() },
                ScanDirection::Backward,
            );
            start = end;
        }
        prop_assert_eq!(engine.stats().orphans, 0);
        prop_assert_eq!(shape(&engine), shape(&reference()));
    }
}

#[test]
fn reference_tree_shape() {
    let engine = reference();
    assert_eq!(engine.ordered_post_ids(), ["9", "6", "1"]);
    assert_eq!(engine.children("1"), ["2", "3"]);
    assert_eq!(engine.children("2"), ["4"]);
    assert_eq!(engine.children("9"), ["10"]);
}

#[test]
fn backward_scan_keeps_siblings_in_block_order() {
    let mut engine = FeedEngine::new();
    engine.merge(single(event(1, 100, None)), ScanDirection::Forward);
    for (id, height) in [(4, 104), (3, 103), (2, 102)] {
        engine.merge(single(event(id, height, Some(1))), ScanDirection::Backward);
    }
    assert_eq!(engine.children("1"), ["2", "3", "4"]);
    let edges = engine.reply_edges();
    assert_eq!((edges[0].sibling_index, edges[0].child_id.as_str()), (0, "2"));
}

#[test]
fn remerging_is_idempotent() {
    let mut engine = reference();
    let edges = engine.reply_edges();
    let ordered = engine.ordered_post_ids().to_vec();

    let outcome = engine.merge(
        Batch {
            events: forest(),
            posters: Vec::new(),
        },
        ScanDirection::Forward,
    );
    assert_eq!(outcome.duplicates, 11);
    assert!(outcome.roots.is_empty());
    assert_eq!(engine.reply_edges(), edges);
    assert_eq!(engine.ordered_post_ids(), ordered.as_slice());
    assert_eq!(engine.stats().duplicates, 11);
}

#[test]
fn deep_orphan_chain_is_promoted_iteratively() {
    const DEPTH: u64 = 20_000;
    let mut engine = FeedEngine::new();
    // Leaf first: every reply arrives before its parent.
    let events = (1..DEPTH).rev().map(|id| event(id, id, Some(id - 1))).collect();
    engine.merge(
        Batch {
            events,
            posters: Vec::new(),
        },
        ScanDirection::Backward,
    );
    assert_eq!(engine.stats().orphans as u64, DEPTH - 1);

    let outcome = engine.merge(single(event(0, 0, None)), ScanDirection::Backward);
    assert_eq!(outcome.roots, vec!["0"]);
    assert_eq!(outcome.rooted_replies.len() as u64, DEPTH - 1);
    assert_eq!(engine.stats().orphans, 0);
    assert_eq!(engine.thread("0").len() as u64, DEPTH);
}

#[test]
fn orphan_older_than_late_parent_is_dropped() {
    let mut engine = FeedEngine::new();
    engine.merge(single(event(2, 50, Some(1))), ScanDirection::Backward);
    engine.merge(single(event(3, 60, Some(2))), ScanDirection::Backward);
    assert_eq!(engine.orphan_children("1"), ["2"]);

    let outcome = engine.merge(single(event(1, 55, None)), ScanDirection::Backward);
    assert_eq!(outcome.rejected, 1);
    assert!(engine.post("2").is_none());
    assert!(engine.children("1").is_empty());
    // Its own waiting reply stays orphaned under the dropped post.
    assert_eq!(engine.orphan_children("2"), ["3"]);
    assert!(engine.post("3").unwrap().orphaned);
}

#[test]
fn forward_roots_come_first() {
    let mut engine = FeedEngine::new();
    engine.merge(single(event(10, 500, None)), ScanDirection::Forward);
    engine.merge(single(event(5, 400, None)), ScanDirection::Backward);
    engine.merge(single(event(11, 501, None)), ScanDirection::Forward);
    engine.merge(
        Batch {
            events: vec![event(3, 300, None), event(4, 300, None)],
            posters: Vec::new(),
        },
        ScanDirection::Backward,
    );
    assert_eq!(engine.ordered_post_ids(), ["11", "10", "5", "4", "3"]);
}
