use super::Archetype;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CharacterRecord {
    pub name: String,
    pub image_url: String,
    pub archetype: Archetype,
}

impl CharacterRecord {
    /// Stand-in shown when the catalog has no record for an archetype.
    pub fn placeholder(archetype: Archetype) -> Self {
        Self {
            name: "No character found".to_string(),
            image_url: String::new(),
            archetype,
        }
    }
}

/// A seed row for the character catalog.
#[derive(Debug, Clone, Copy)]
pub struct NewCharacter {
    pub name: &'static str,
    pub image_url: &'static str,
    pub archetype: &'static str,
}

/// Everything the character page needs for one track.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterView {
    pub track_id: String,
    pub track_name: String,
    /// Primary artist genre, or "No Genre Found" when the artist has none
    pub genre: String,
    /// Title-cased genre for display
    pub character_type: String,
    pub archetype: Archetype,
    pub character: CharacterRecord,
    pub found: bool,
}
