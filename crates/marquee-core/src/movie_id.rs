use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Identifier of a movie in the catalog.
///
/// Catalog ids are UUIDs. [`MovieId::new`] enforces that at the edge of the
/// system and stores the lowercase hyphenated form, so every accepted
/// spelling of a UUID names the same movie. Stores and the detail assembler
/// trust whatever they are given.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    /// Creates a new `MovieId` after checking that the input is a UUID.
    pub fn new(id: impl Into<String>) -> std::result::Result<Self, CoreError> {
        let id = id.into();
        let uuid =
            Uuid::parse_str(&id).map_err(|e| CoreError::InvalidMovieId(format!("'{id}': {e}")))?;
        Ok(Self(uuid.hyphenated().to_string()))
    }

    /// Creates a `MovieId` without validation.
    ///
    /// Use this only for ids read back from a store or built in tests.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
