//! Watchlist Entry Entity
//!
//! A single active surveillance target loaded from the active-targets file.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Embedding;

/// The source database a target was pulled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Criminal,
    Missing,
}

/// A watchlist target: identity, priority, stored embeddings and display
/// metadata. At least one of `dlib_embedding`/`arcface_embedding` is present
/// (enforced at load time by [`crate::infrastructure::watchlist_file`]).
#[derive(Debug, Clone)]
pub struct WatchlistEntry {
    /// Stable identifier used for alert filenames (`alerts/{id}.json`).
    id: String,
    /// Unique identity string; this is what the matching, recency-cache and
    /// debouncer layers key on.
    name: String,
    priority: u8,
    is_wanted: bool,
    db_type: DbType,
    dlib_embedding: Option<Embedding>,
    arcface_embedding: Option<Embedding>,
    image_filename: String,
}

impl WatchlistEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        name: String,
        priority: u8,
        is_wanted: bool,
        db_type: DbType,
        dlib_embedding: Option<Embedding>,
        arcface_embedding: Option<Embedding>,
        image_filename: String,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            is_wanted,
            db_type,
            dlib_embedding,
            arcface_embedding,
            image_filename,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identity string matching, recency-cache and debouncer operate on.
    pub fn identity(&self) -> &str {
        &self.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_wanted(&self) -> bool {
        self.is_wanted
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn dlib_embedding(&self) -> Option<&Embedding> {
        self.dlib_embedding.as_ref()
    }

    pub fn arcface_embedding(&self) -> Option<&Embedding> {
        self.arcface_embedding.as_ref()
    }

    pub fn image_filename(&self) -> &str {
        &self.image_filename
    }
}
