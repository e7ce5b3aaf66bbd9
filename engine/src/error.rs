use std::path::{Path, PathBuf};
use thiserror::Error;

/// Text of the single record returned in place of recommendations when no
/// input name matched the catalog.
pub const NO_VALID_ITEMS_MESSAGE: &str = "No valid games found";

#[derive(Debug, Error)]
pub enum RecommenderError {
    /// The catalog or a snapshot could not be read. Fatal at startup.
    #[error("failed to load {}: {message}", path.display())]
    DataLoad { path: PathBuf, message: String },

    /// None of the requested names matched a catalog entry.
    #[error("no valid games found (unresolved: {unresolved:?})")]
    NoValidItemsFound { unresolved: Vec<String> },
}

impl RecommenderError {
    pub(crate) fn data_load(path: &Path, message: impl std::fmt::Display) -> Self {
        RecommenderError::DataLoad { path: path.to_path_buf(), message: message.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
