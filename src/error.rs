//! Error types with fix suggestions

use std::path::PathBuf;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Errors surfaced by the pool framework.
///
/// Only configuration errors abort a run; unit failures and export failures
/// are recovered where they happen and surface as counters or printed lines.
#[derive(Error, Debug)]
pub enum MillError {
    #[error("Invalid pool configuration: {details}")]
    InvalidConfig { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export to '{path}' failed: {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MillError {
    pub fn invalid_config(details: impl Into<String>) -> Self {
        MillError::InvalidConfig {
            details: details.into(),
        }
    }
}

impl FixSuggestion for MillError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            MillError::InvalidConfig { .. } => {
                Some("Pass --concurrency with a positive worker count, or omit it to auto-size")
            }
            MillError::Io(_) => Some("Check file paths and permissions"),
            MillError::ExportFailed { .. } => {
                Some("Check that the export directory is writable and has free space")
            }
        }
    }
}
