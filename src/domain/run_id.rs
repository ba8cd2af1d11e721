//! Type-safe scrape run identifier.
//!
//! [`RunId`] wraps a [`uuid::Uuid`] (v4) so run identifiers cannot be
//! confused with task row ids or other UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of one in-process scrape run.
///
/// Generated when a run is registered and used to look its status up in
/// [`super::RunRegistry`]. A run gets a database task id only once it
/// completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Creates a new random `RunId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `RunId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for RunId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}
