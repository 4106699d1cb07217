use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when no taxonomy keyword matches any genre.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A character archetype name, e.g. "Rocker" or "Pop Star".
///
/// The set of valid archetypes is whatever the loaded genre taxonomy declares,
/// plus the "Unknown Artist" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Archetype(String);

impl Archetype {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_ARTIST.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_ARTIST
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Archetype {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
