use crate::movie_id::MovieId;
use crate::section::Section;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid movie id: {0}")]
    InvalidMovieId(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// The catalog operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Base,
    Section(Section),
    Search,
    Discover,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Base => f.write_str("fetch base movie"),
            Operation::Section(section) => write!(f, "fetch {section}"),
            Operation::Search => f.write_str("search movies"),
            Operation::Discover => f.write_str("discover movies"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("movie not found: {0}")]
    NotFound(MovieId),
    #[error("{operation} failed: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StorageError,
    },
    #[error("{0} was cancelled")]
    Cancelled(Operation),
    #[error("section task failed: {0}")]
    TaskFailed(String),
}

impl CatalogError {
    pub fn store(operation: Operation, source: StorageError) -> Self {
        Self::Store { operation, source }
    }

    /// Returns the operation the error is attributed to, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            CatalogError::NotFound(_) => Some(Operation::Base),
            CatalogError::Store { operation, .. } | CatalogError::Cancelled(operation) => {
                Some(*operation)
            }
            CatalogError::TaskFailed(_) => None,
        }
    }
}
