//! Typed errors for each stage of the search pipeline.
//!
//! Every stage reports failure through its own enum so callers can tell
//! "nothing matched" apart from "something broke". Recoverable per-item
//! problems (a corrupt file, a bad year range, one failed analyzer call)
//! are collected alongside the partial result instead of aborting it.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::SkippedFile;

/// The corpus could not be assembled from a source directory.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("source directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to read source directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid source file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("no *.{extension} files found in {}", .dir.display())]
    NoMatchingFiles { dir: PathBuf, extension: String },

    #[error("no usable rows in {} ({} file(s) skipped)", .dir.display(), .skipped.len())]
    NoUsableRows {
        dir: PathBuf,
        skipped: Vec<SkippedFile>,
    },
}

/// A single filter token could not be understood. The token is dropped and
/// the remaining criteria still apply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedCriteriaError {
    #[error("invalid year range '{token}': expected YYYY-YYYY or YYYY_YYYY")]
    InvalidYearRange { token: String },
}

impl MalformedCriteriaError {
    pub fn token(&self) -> &str {
        match self {
            Self::InvalidYearRange { token } => token,
        }
    }
}

/// The text-analysis capability failed for one input.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("text analysis is disabled")]
    Disabled,

    #[error("analyzer timed out after {0:?}")]
    Timeout(Duration),

    #[error("analyzer service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("invalid analyzer response: {0}")]
    InvalidResponse(String),

    #[error("analyzer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analyzer not ready: {0}")]
    NotReady(String),
}

/// Filtering could not be evaluated against the corpus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("corpus has no '{column}' column to filter on")]
    MissingColumn { column: String },
}

/// Failures surfaced by a full search request.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown source: '{0}'")]
    UnknownSource(String),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("corpus load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
