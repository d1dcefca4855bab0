use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;

/// Failures the driver distinguishes when deciding whether to continue.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("No results found for {category} in {location}")]
    NoResults { category: String, location: String },

    #[error("Missing checkpoint for batch {batch_key} at {}", path.display())]
    CheckpointMissing { batch_key: String, path: PathBuf },

    #[error("Invalid header schema: expected {expected} columns, got {got}")]
    InvalidHeaders { expected: usize, got: usize },

    #[error("No browser session could be established: {0}")]
    NoSession(#[source] anyhow::Error),

    #[error("Browser error: {0}")]
    Browser(#[source] anyhow::Error),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Errors which invalidate the whole run rather than a single target.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeaders { .. } | Self::CheckpointMissing { .. } | Self::NoSession(_)
        )
    }
}
