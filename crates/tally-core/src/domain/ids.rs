//! Message identifiers.
//!
//! Ids are opaque strings on the wire. Ids minted by this crate are ULIDs
//! with a `msg-` prefix, so they sort by creation time and can be generated
//! on any producer without coordination.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a queued message.
///
/// An empty id means "not assigned yet"; `enqueue` replaces it with a fresh
/// one. Once assigned an id never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    const PREFIX: &'static str = "msg-";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{}{}", Self::PREFIX, ulid))
    }

    /// The placeholder id carried by messages that were never enqueued.
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
