//! Watchlist
//!
//! Holds the active-targets list in priority order and answers "is this
//! embedding a match for anyone on the list?". Priority governs iteration
//! order only — the globally highest-similarity candidate wins regardless
//! of which priority tier it was found in.

use std::sync::RwLock;

use tracing::{error, warn};

use crate::domain::entities::WatchlistEntry;
use crate::domain::value_objects::{Embedding, EmbeddingKind};

/// Acceptance thresholds for each embedding kind.
#[derive(Debug, Clone, Copy)]
pub struct MatchThresholds {
    /// Maximum Euclidean distance accepted for a Dlib-style match.
    pub dlib_accept_distance: f32,
    /// Minimum cosine similarity accepted for an ArcFace-style match.
    pub arcface_accept_similarity: f32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            dlib_accept_distance: 0.35,
            arcface_accept_similarity: 0.55,
        }
    }
}

/// A match candidate returned by [`Watchlist::best_match`].
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub identity: String,
    pub id: String,
    pub priority: u8,
    pub is_wanted: bool,
    pub db_type: crate::domain::entities::DbType,
    /// Normalised score in `0.0..=1.0`, higher is better, comparable across
    /// embedding kinds even though the underlying metrics differ.
    pub score: f32,
}

/// Thread-safe holder of the active targets list, swapped wholesale on
/// reload so readers never observe a half-written list.
pub struct Watchlist {
    entries: RwLock<Vec<WatchlistEntry>>,
    thresholds: MatchThresholds,
}

impl Watchlist {
    pub fn new(entries: Vec<WatchlistEntry>, thresholds: MatchThresholds) -> Self {
        let mut entries = entries;
        entries.sort_by_key(|e| e.priority());
        Self {
            entries: RwLock::new(entries),
            thresholds,
        }
    }

    /// Replaces the whole list. On reload failures the caller should not
    /// call this at all — the previous list then simply stays active.
    pub fn reload(&self, mut entries: Vec<WatchlistEntry>) {
        entries.sort_by_key(|e| e.priority());
        *self.entries.write().unwrap() = entries;
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the full entry for an identity, used by the matching stage
    /// to hand the `AlertSink` the metadata `MatchCandidate` does not
    /// carry (e.g. `image_filename`). Returns `None` if the watchlist was
    /// reloaded and the identity is no longer present.
    pub fn entry_by_identity(&self, identity: &str) -> Option<WatchlistEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.identity() == identity)
            .cloned()
    }

    /// Scores `embedding` against every entry carrying a same-kind stored
    /// embedding and returns the single best-scoring acceptable match, if
    /// any. Entries are visited in priority order, but the comparison is
    /// global: the highest score across all tiers always wins a tie-break
    /// in iteration order does not mask a higher-priority but lower-score
    /// candidate.
    pub fn best_match(&self, embedding: &Embedding) -> Option<MatchCandidate> {
        let entries = self.entries.read().unwrap();
        let mut best: Option<MatchCandidate> = None;

        for entry in entries.iter() {
            let stored = match embedding.kind() {
                EmbeddingKind::Dlib => entry.dlib_embedding(),
                EmbeddingKind::ArcFace => entry.arcface_embedding(),
            };
            let Some(stored) = stored else { continue };

            let score = match embedding.kind() {
                EmbeddingKind::Dlib => {
                    let Some(distance) = embedding.distance(stored) else {
                        continue;
                    };
                    if distance > self.thresholds.dlib_accept_distance {
                        continue;
                    }
                    1.0 - distance.min(1.0)
                }
                EmbeddingKind::ArcFace => {
                    let Some(similarity) = embedding.cosine_similarity(stored) else {
                        continue;
                    };
                    if similarity < self.thresholds.arcface_accept_similarity {
                        continue;
                    }
                    similarity
                }
            };

            let is_new_best = match &best {
                Some(current) => score > current.score,
                None => true,
            };
            if is_new_best {
                best = Some(MatchCandidate {
                    identity: entry.identity().to_string(),
                    id: entry.id().to_string(),
                    priority: entry.priority(),
                    is_wanted: entry.is_wanted(),
                    db_type: entry.db_type(),
                    score,
                });
            }
        }

        best
    }
}

/// Validates that a freshly-parsed entry set is usable, logging and
/// dropping entries that carry no embedding of either kind rather than
/// failing the whole reload.
pub fn sanitize_entries(entries: Vec<WatchlistEntry>) -> Vec<WatchlistEntry> {
    entries
        .into_iter()
        .filter(|e| {
            let ok = e.dlib_embedding().is_some() || e.arcface_embedding().is_some();
            if !ok {
                warn!(identity = e.identity(), "dropping watchlist entry with no embedding");
            }
            ok
        })
        .collect()
}

pub fn log_reload_failure(path: &str, err: &anyhow::Error) {
    error!(path, error = %err, "watchlist reload failed, keeping previous list active");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DbType;

    fn entry(name: &str, priority: u8, dlib_value: f32) -> WatchlistEntry {
        WatchlistEntry::new(
            format!("id-{name}"),
            name.to_string(),
            priority,
            false,
            DbType::Criminal,
            Some(Embedding::new(EmbeddingKind::Dlib, vec![dlib_value; 128]).unwrap()),
            None,
            format!("{name}.jpg"),
        )
    }

    #[test]
    fn empty_watchlist_has_no_match() {
        let list = Watchlist::new(Vec::new(), MatchThresholds::default());
        let probe = Embedding::new(EmbeddingKind::Dlib, vec![0.0; 128]).unwrap();
        assert!(list.best_match(&probe).is_none());
    }

    #[test]
    fn exact_match_is_accepted() {
        let list = Watchlist::new(vec![entry("alice", 3, 0.1)], MatchThresholds::default());
        let probe = Embedding::new(EmbeddingKind::Dlib, vec![0.1; 128]).unwrap();
        let m = list.best_match(&probe).unwrap();
        assert_eq!(m.identity, "alice");
    }

    #[test]
    fn dlib_score_normalises_against_unit_distance_not_the_threshold() {
        // distance 0.2 against an accept threshold of 0.35 should score
        // 1.0 - 0.2 = 0.8, not 1.0 - (0.2 / 0.35).
        let list = Watchlist::new(vec![entry("alice", 1, 0.0)], MatchThresholds::default());
        let probe = Embedding::new(EmbeddingKind::Dlib, vec![0.2 / (128.0f32).sqrt(); 128]).unwrap();
        let m = list.best_match(&probe).unwrap();
        assert!((m.score - 0.8).abs() < 0.01);
    }

    #[test]
    fn distance_beyond_threshold_is_rejected() {
        let list = Watchlist::new(vec![entry("alice", 3, 10.0)], MatchThresholds::default());
        let probe = Embedding::new(EmbeddingKind::Dlib, vec![0.0; 128]).unwrap();
        assert!(list.best_match(&probe).is_none());
    }

    #[test]
    fn global_best_score_wins_over_priority_order() {
        // "bob" is lower priority (higher number = lower priority here) but
        // is the closer match; best_match must still pick bob.
        let list = Watchlist::new(
            vec![entry("alice", 1, 0.30), entry("bob", 5, 0.05)],
            MatchThresholds::default(),
        );
        let probe = Embedding::new(EmbeddingKind::Dlib, vec![0.0; 128]).unwrap();
        let m = list.best_match(&probe).unwrap();
        assert_eq!(m.identity, "bob");
    }

    #[test]
    fn sanitize_entries_drops_embeddingless_entries() {
        let bare = WatchlistEntry::new(
            "id-bare".to_string(),
            "bare".to_string(),
            1,
            false,
            DbType::Criminal,
            None,
            None,
            "bare.jpg".to_string(),
        );
        let kept = sanitize_entries(vec![bare, entry("alice", 1, 0.0)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].identity(), "alice");
    }

    #[test]
    fn reload_replaces_the_list_atomically() {
        let list = Watchlist::new(vec![entry("alice", 1, 0.0)], MatchThresholds::default());
        assert_eq!(list.len(), 1);
        list.reload(vec![entry("bob", 1, 0.0), entry("carol", 2, 0.0)]);
        assert_eq!(list.len(), 2);
    }
}
