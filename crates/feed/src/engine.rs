//! Feed reconciliation: merges extracted post events into a reply tree.
//!
//! Posts live in arena maps keyed by post id. Attached replies are indexed by parent in
//! `replies`; replies whose parent is unknown or itself orphaned wait in `orphans`. When a
//! post becomes rooted, its waiting subtree is promoted with an explicit worklist, so chain
//! depth never grows the call stack.

use crate::types::Identity;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// A post as decoded from one contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEvent {
    pub post_id: String,
    pub poster: String,
    pub message: String,
    pub block_height: u64,
    pub timestamp: u64,
    pub transaction: String,
    pub reply_to_post_id: Option<String>,
}

/// Presentation flags carried with each post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    pub text_overflows: bool,
    pub text_overflow_hidden: bool,
    pub replies_hidden: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            text_overflows: false,
            text_overflow_hidden: true,
            replies_hidden: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub post_id: String,
    pub poster: String,
    pub message: String,
    pub block_height: u64,
    pub timestamp: u64,
    pub transaction: String,
    pub reply_to_post_id: Option<String>,
    /// True while the parent chain does not reach a root. Only ever goes true -> false.
    pub orphaned: bool,
    pub display: DisplaySettings,
}

impl Post {
    fn from_event(event: PostEvent, orphaned: bool) -> Self {
        Self {
            post_id: event.post_id,
            poster: event.poster,
            message: event.message,
            block_height: event.block_height,
            timestamp: event.timestamp,
            transaction: event.transaction,
            reply_to_post_id: event.reply_to_post_id,
            orphaned,
            display: DisplaySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Poster {
    pub address: String,
    pub stake: String,
    pub age: u64,
    pub pubkey: String,
    pub state: String,
    pub online: bool,
}

impl Poster {
    /// Poster with only an address, for nodes that return no identity.
    pub fn unknown(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn from_identity(address: &str, identity: Identity) -> Self {
        Self {
            address: address.to_string(),
            stake: identity.stake,
            age: identity.age,
            pubkey: identity.pubkey,
            state: identity.state,
            online: identity.online,
        }
    }
}

/// `(parent, sibling index) -> child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub parent_id: String,
    pub sibling_index: usize,
    pub child_id: String,
}

/// Everything extracted from one block or one indexer page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub events: Vec<PostEvent>,
    pub posters: Vec<Poster>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanDirection {
    Forward,
    Backward,
}

/// What one merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// New root posts in display order (height descending, later arrival first).
    pub roots: Vec<String>,
    /// Replies attached to the rooted tree by this merge, including promoted orphans, in walk order.
    pub rooted_replies: Vec<String>,
    /// Replies still waiting for their parent after this merge.
    pub orphaned: Vec<String>,
    /// Replies dropped for preceding or coinciding with their parent.
    pub rejected: usize,
    /// Events whose post id was already known.
    pub duplicates: usize,
}

impl MergeOutcome {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
            && self.rooted_replies.is_empty()
            && self.orphaned.is_empty()
            && self.rejected == 0
            && self.duplicates == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub posts: usize,
    pub posters: usize,
    pub roots: usize,
    pub orphans: usize,
    pub causality_rejections: u64,
    pub duplicates: u64,
}

#[derive(Debug, Default)]
pub struct FeedEngine {
    posts: HashMap<String, Post>,
    posters: HashMap<String, Poster>,
    replies: HashMap<String, Vec<String>>,
    orphans: HashMap<String, Vec<String>>,
    ordered: Vec<String>,
    causality_rejections: u64,
    duplicates: u64,
}

impl FeedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one batch. Posters are inserted or refreshed first, then events in arrival order.
    ///
    /// Roots are kept newest block first and siblings oldest block first, with arrival order
    /// breaking ties, so the tree and root order do not depend on which direction or in which
    /// order blocks were scanned.
    pub fn merge(&mut self, batch: Batch, direction: ScanDirection) -> MergeOutcome {
        for poster in batch.posters {
            self.posters.insert(poster.address.clone(), poster);
        }

        let mut outcome = MergeOutcome::default();
        let mut new_roots: Vec<(u64, usize, String)> = Vec::new();

        for (arrival, event) in batch.events.into_iter().enumerate() {
            if self.posts.contains_key(&event.post_id) {
                outcome.duplicates += 1;
                continue;
            }
            let post_id = event.post_id.clone();

            match event.reply_to_post_id.clone() {
                None => {
                    new_roots.push((event.block_height, arrival, post_id.clone()));
                    self.posts.insert(post_id.clone(), Post::from_event(event, false));
                }
                Some(parent_id) => {
                    let parent = self.posts.get(&parent_id);
                    let violates = parent_id == post_id
                        || parent.map_or(false, |p| p.block_height >= event.block_height);
                    if violates {
                        tracing::debug!(post_id = %post_id, parent_id = %parent_id, "reply precedes its parent, dropped");
                        outcome.rejected += 1;
                        continue;
                    }
                    let parent_rooted = parent.map_or(false, |p| !p.orphaned);
                    let index = if parent_rooted { &mut self.replies } else { &mut self.orphans };
                    insert_sibling(
                        &self.posts,
                        index.entry(parent_id).or_default(),
                        &post_id,
                        event.block_height,
                    );
                    if parent_rooted {
                        outcome.rooted_replies.push(post_id.clone());
                    } else {
                        outcome.orphaned.push(post_id.clone());
                    }
                    self.posts.insert(post_id.clone(), Post::from_event(event, !parent_rooted));
                    if !parent_rooted {
                        continue;
                    }
                }
            }

            self.promote_orphans(&post_id, &mut outcome);
        }

        outcome.orphaned.retain(|id| self.posts.get(id).map_or(false, |p| p.orphaned));

        new_roots.sort_by_key(|(height, arrival, _)| (Reverse(*height), Reverse(*arrival)));
        // Oldest first, each ahead of known roots of the same height.
        for (height, _, id) in new_roots.iter().rev() {
            let at = self
                .ordered
                .partition_point(|r| self.posts.get(r).map_or(false, |p| p.block_height > *height));
            self.ordered.insert(at, id.clone());
        }
        outcome.roots = new_roots.into_iter().map(|(_, _, id)| id).collect();
        tracing::trace!(?direction, roots = outcome.roots.len(), "batch merged");

        self.causality_rejections += outcome.rejected as u64;
        self.duplicates += outcome.duplicates as u64;
        outcome
    }

    /// Move the orphan subtree waiting under a freshly rooted post into the reply index.
    /// Depth-first, children in sibling order; waiting children that do not come strictly
    /// after their parent are dropped.
    fn promote_orphans(&mut self, rooted_id: &str, outcome: &mut MergeOutcome) {
        let mut stack = vec![rooted_id.to_string()];
        while let Some(parent_id) = stack.pop() {
            if parent_id != rooted_id {
                outcome.rooted_replies.push(parent_id.clone());
            }
            let Some(waiting) = self.orphans.remove(&parent_id) else {
                continue;
            };
            let Some(parent_height) = self.posts.get(&parent_id).map(|p| p.block_height) else {
                continue;
            };

            let mut attached = Vec::with_capacity(waiting.len());
            for child_id in waiting {
                let Some(child_height) = self.posts.get(&child_id).map(|c| c.block_height) else {
                    continue;
                };
                if child_height <= parent_height {
                    tracing::debug!(post_id = %child_id, parent_id = %parent_id, "orphan precedes its parent, dropped");
                    self.posts.remove(&child_id);
                    outcome.rejected += 1;
                    continue;
                }
                if let Some(child) = self.posts.get_mut(&child_id) {
                    child.orphaned = false;
                }
                attached.push((child_id, child_height));
            }
            let siblings = self.replies.entry(parent_id).or_default();
            for (child_id, height) in &attached {
                insert_sibling(&self.posts, siblings, child_id, *height);
            }
            stack.extend(attached.into_iter().rev().map(|(id, _)| id));
        }
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.posts.get(post_id)
    }

    pub fn poster(&self, address: &str) -> Option<&Poster> {
        self.posters.get(address)
    }

    pub fn has_poster(&self, address: &str) -> bool {
        self.posters.contains_key(address)
    }

    pub fn poster_addresses(&self) -> HashSet<String> {
        self.posters.keys().cloned().collect()
    }

    /// Attached replies of `post_id`, by sibling index.
    pub fn children(&self, post_id: &str) -> &[String] {
        self.replies.get(post_id).map_or(&[], Vec::as_slice)
    }

    /// Replies waiting for `post_id` to become rooted.
    pub fn orphan_children(&self, post_id: &str) -> &[String] {
        self.orphans.get(post_id).map_or(&[], Vec::as_slice)
    }

    /// Root post ids in display order.
    pub fn ordered_post_ids(&self) -> &[String] {
        &self.ordered
    }

    pub fn reply_edges(&self) -> Vec<Edge> {
        collect_edges(&self.replies)
    }

    pub fn orphan_edges(&self) -> Vec<Edge> {
        collect_edges(&self.orphans)
    }

    /// `root` followed by its attached replies, depth-first in sibling order.
    pub fn thread(&self, root: &str) -> Vec<&Post> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(post) = self.posts.get(id) {
                out.push(post);
            }
            stack.extend(self.children(id).iter().rev().map(String::as_str));
        }
        out
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            posts: self.posts.len(),
            posters: self.posters.len(),
            roots: self.ordered.len(),
            orphans: self.posts.values().filter(|p| p.orphaned).count(),
            causality_rejections: self.causality_rejections,
            duplicates: self.duplicates,
        }
    }
}

/// Siblings stay in block order; equal heights keep arrival order.
fn insert_sibling(posts: &HashMap<String, Post>, siblings: &mut Vec<String>, child_id: &str, height: u64) {
    let at = siblings.partition_point(|s| posts.get(s).map_or(true, |p| p.block_height <= height));
    siblings.insert(at, child_id.to_string());
}

fn collect_edges(index: &HashMap<String, Vec<String>>) -> Vec<Edge> {
    let mut edges: Vec<Edge> = index
        .iter()
        .flat_map(|(parent, children)| {
            children.iter().enumerate().map(move |(i, child)| Edge {
                parent_id: parent.clone(),
                sibling_index: i,
                child_id: child.clone(),
            })
        })
        .collect();
    edges.sort_by(|a, b| (&a.parent_id, a.sibling_index).cmp(&(&b.parent_id, b.sibling_index)));
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, height: u64, reply_to: Option<&str>) -> PostEvent {
        PostEvent {
            post_id: id.to_string(),
            poster: "0xposter".to_string(),
            message: format!("message {id}"),
            block_height: height,
            timestamp: height * 20,
            transaction: format!("0xtx{id}"),
            reply_to_post_id: reply_to.map(str::to_string),
        }
    }

    fn batch(events: Vec<PostEvent>) -> Batch {
        Batch {
            events,
            posters: Vec::new(),
        }
    }

    #[test]
    fn reply_to_rooted_parent_attaches() {
        let mut engine = FeedEngine::new();
        engine.merge(batch(vec![event("1", 10, None)]), ScanDirection::Forward);
        let out = engine.merge(batch(vec![event("2", 11, Some("1"))]), ScanDirection::Forward);
        assert_eq!(out.rooted_replies, vec!["2"]);
        assert!(out.roots.is_empty());
        assert_eq!(engine.children("1"), ["2".to_string()]);
        assert!(!engine.post("2").unwrap().orphaned);
    }

    #[test]
    fn orphan_rejoins_when_parent_arrives() {
        let mut engine = FeedEngine::new();
        let out = engine.merge(batch(vec![event("2", 11, Some("1"))]), ScanDirection::Backward);
        assert_eq!(out.orphaned, vec!["2"]);
        assert!(engine.post("2").unwrap().orphaned);
        assert_eq!(engine.orphan_children("1"), ["2".to_string()]);

        let out = engine.merge(batch(vec![event("1", 10, None)]), ScanDirection::Backward);
        assert_eq!(out.roots, vec!["1"]);
        assert_eq!(out.rooted_replies, vec!["2"]);
        assert!(!engine.post("2").unwrap().orphaned);
        assert!(engine.orphan_children("1").is_empty());
        assert_eq!(engine.children("1"), ["2".to_string()]);
    }

    #[test]
    fn deep_chain_promoted_in_one_merge() {
        let mut engine = FeedEngine::new();
        // 5 -> 4 -> 3 -> 2 -> 1(root), arriving leaf first
        let chain: Vec<PostEvent> = (2..=5)
            .rev()
            .map(|i| {
                let parent = (i - 1).to_string();
                event(&i.to_string(), 10 + i, Some(&parent))
            })
            .collect();
        engine.merge(batch(chain), ScanDirection::Backward);
        assert_eq!(engine.stats().orphans, 4);

        let out = engine.merge(batch(vec![event("1", 11, None)]), ScanDirection::Backward);
        assert_eq!(out.rooted_replies, vec!["2", "3", "4", "5"]);
        assert_eq!(engine.stats().orphans, 0);
        let thread: Vec<&str> = engine.thread("1").iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(thread, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn promotion_walk_is_depth_first_in_sibling_order() {
        let mut engine = FeedEngine::new();
        engine.merge(
            batch(vec![
                event("a", 20, Some("r")),
                event("b", 21, Some("r")),
                event("a1", 22, Some("a")),
                event("b1", 23, Some("b")),
            ]),
            ScanDirection::Backward,
        );
        let out = engine.merge(batch(vec![event("r", 10, None)]), ScanDirection::Backward);
        assert_eq!(out.rooted_replies, vec!["a", "a1", "b", "b1"]);
        assert_eq!(engine.children("r"), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reply_not_after_parent_is_rejected() {
        let mut engine = FeedEngine::new();
        engine.merge(batch(vec![event("1", 10, None)]), ScanDirection::Forward);
        let out = engine.merge(
            batch(vec![event("2", 10, Some("1")), event("3", 9, Some("1"))]),
            ScanDirection::Forward,
        );
        assert_eq!(out.rejected, 2);
        assert!(engine.post("2").is_none());
        assert!(engine.post("3").is_none());
        assert_eq!(engine.stats().causality_rejections, 2);
    }

    #[test]
    fn orphan_violating_late_parent_is_dropped() {
        let mut engine = FeedEngine::new();
        engine.merge(batch(vec![event("2", 5, Some("1"))]), ScanDirection::Backward);
        let out = engine.merge(batch(vec![event("1", 10, None)]), ScanDirection::Backward);
        assert_eq!(out.rejected, 1);
        assert!(out.rooted_replies.is_empty());
        assert!(engine.post("2").is_none());
        assert!(engine.children("1").is_empty());
    }

    #[test]
    fn self_reply_rejected() {
        let mut engine = FeedEngine::new();
        let out = engine.merge(batch(vec![event("1", 10, Some("1"))]), ScanDirection::Forward);
        assert_eq!(out.rejected, 1);
        assert!(engine.post("1").is_none());
    }

    #[test]
    fn remerge_is_noop() {
        let mut engine = FeedEngine::new();
        let b = batch(vec![event("1", 10, None), event("2", 11, Some("1"))]);
        engine.merge(b.clone(), ScanDirection::Forward);
        let before = engine.reply_edges();
        let out = engine.merge(b, ScanDirection::Forward);
        assert_eq!(out.duplicates, 2);
        assert!(out.roots.is_empty());
        assert_eq!(engine.reply_edges(), before);
        assert_eq!(engine.ordered_post_ids(), ["1".to_string()]);
    }

    #[test]
    fn forward_prepends_backward_appends() {
        let mut engine = FeedEngine::new();
        engine.merge(batch(vec![event("10", 100, None)]), ScanDirection::Forward);
        engine.merge(batch(vec![event("11", 101, None), event("12", 101, None)]), ScanDirection::Forward);
        engine.merge(batch(vec![event("9", 99, None)]), ScanDirection::Backward);
        assert_eq!(engine.ordered_post_ids(), ["12", "11", "10", "9"].map(String::from));
    }

    #[test]
    fn roots_sorted_by_height_within_batch() {
        let mut engine = FeedEngine::new();
        let out = engine.merge(
            batch(vec![event("a", 50, None), event("b", 49, None), event("c", 50, None)]),
            ScanDirection::Backward,
        );
        assert_eq!(out.roots, vec!["c", "a", "b"]);
    }

    #[test]
    fn posters_refreshed() {
        let mut engine = FeedEngine::new();
        let mut b = batch(Vec::new());
        b.posters.push(Poster::unknown("0xA"));
        engine.merge(b, ScanDirection::Forward);
        let mut b = batch(Vec::new());
        b.posters.push(Poster {
            age: 7,
            ..Poster::unknown("0xA")
        });
        engine.merge(b, ScanDirection::Forward);
        assert_eq!(engine.poster("0xA").unwrap().age, 7);
        assert_eq!(engine.stats().posters, 1);
    }

    #[test]
    fn edges_listed_by_parent_and_index() {
        let mut engine = FeedEngine::new();
        engine.merge(
            batch(vec![
                event("r", 1, None),
                event("x", 2, Some("r")),
                event("y", 3, Some("r")),
                event("z", 4, Some("missing")),
            ]),
            ScanDirection::Forward,
        );
        let edges = engine.reply_edges();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[1].sibling_index, edges[1].child_id.as_str()), (1, "y"));
        let orphans = engine.orphan_edges();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].parent_id, "missing");
    }
}
