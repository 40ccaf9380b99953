//! Domain Errors
//!
//! Typed errors for fatal, construction-time failures. Soft failures in the
//! hot path are logged and swallowed at the point they occur; they never
//! propagate as `EngineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load watchlist from {path}: {source}")]
    WatchlistLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse watchlist JSON: {0}")]
    WatchlistParse(#[from] serde_json::Error),

    #[error("watchlist entry {id:?} has no embedding of any kind")]
    WatchlistEntryMissingEmbedding { id: String },

    #[error("frame source unavailable: {0}")]
    FrameSourceUnavailable(String),

    #[error("model initialisation failed: {0}")]
    ModelInit(String),
}
