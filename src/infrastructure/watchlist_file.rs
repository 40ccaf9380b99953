//! Watchlist File Loader
//!
//! Parses the active-targets JSON file into `WatchlistEntry` values. The
//! file is produced by the surrounding system; this loader only reads it
//! and enforces the one load-time invariant the core relies on: every
//! entry carries at least one embedding kind.

use std::path::Path;

use serde::Deserialize;

use crate::application::services::sanitize_entries;
use crate::domain::entities::{DbType, WatchlistEntry};
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{Embedding, EmbeddingKind};

#[derive(Debug, Deserialize)]
struct RawEmbeddings {
    dlib: Option<Vec<f32>>,
    arcface: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    name: String,
    db_type: DbType,
    priority: u8,
    #[serde(default)]
    is_wanted: bool,
    embeddings: RawEmbeddings,
    image_filename: String,
}

/// Loads and parses the active-targets file at `path`.
///
/// Returns entries sanitised by [`sanitize_entries`] (embeddingless entries
/// dropped with a warning) but not yet priority-sorted — sorting is the
/// `Watchlist`'s responsibility.
pub fn load(path: &Path) -> Result<Vec<WatchlistEntry>, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|source| EngineError::WatchlistLoad {
        path: path.display().to_string(),
        source,
    })?;

    let raw_entries: Vec<RawEntry> = serde_json::from_str(&raw)?;

    let entries = raw_entries
        .into_iter()
        .map(|raw| {
            let dlib_embedding = raw
                .embeddings
                .dlib
                .and_then(|v| Embedding::new(EmbeddingKind::Dlib, v).ok());
            let arcface_embedding = raw
                .embeddings
                .arcface
                .and_then(|v| Embedding::new(EmbeddingKind::ArcFace, v).ok());

            WatchlistEntry::new(
                raw.id,
                raw.name,
                raw.priority,
                raw.is_wanted,
                raw.db_type,
                dlib_embedding,
                arcface_embedding,
                raw.image_filename,
            )
        })
        .collect();

    Ok(sanitize_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_entries_and_drops_embeddingless_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "t-1", "name": "alice", "db_type": "criminal", "priority": 1,
                  "is_wanted": true, "embeddings": {{"dlib": {dlib}}}, "image_filename": "alice.jpg"}},
                {{"id": "t-2", "name": "bare", "db_type": "missing", "priority": 2,
                  "embeddings": {{}}, "image_filename": "bare.jpg"}}
            ]"#,
            dlib = serde_json::to_string(&vec![0.0f32; 128]).unwrap()
        )
        .unwrap();

        let entries = load(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identity(), "alice");
    }

    #[test]
    fn missing_file_is_a_watchlist_load_error() {
        let err = load(Path::new("/nonexistent/watchlist.json")).unwrap_err();
        assert!(matches!(err, EngineError::WatchlistLoad { .. }));
    }
}
