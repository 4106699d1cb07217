use super::Archetype;
use serde::{Deserialize, Serialize};

/// Shown wherever a track's artist has no genre on record.
pub const NO_GENRE_FOUND: &str = "No Genre Found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub preview_url: Option<String>,
}

impl TrackSummary {
    pub fn primary_artist(&self) -> Option<&ArtistRef> {
        self.artists.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Artist {
    pub fn primary_genre(&self) -> Option<&str> {
        self.genres
            .first()
            .map(|g| g.as_str())
            .filter(|g| !g.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub genre: Option<String>,
    pub genre_label: String,
    pub archetype: Archetype,
    pub preview_url: Option<String>,
}

impl EnrichedTrack {
    pub fn new(track: TrackSummary, genre: Option<String>, archetype: Archetype) -> Self {
        let artist = track
            .primary_artist()
            .map(|a| a.name.clone())
            .unwrap_or_default();
        let genre_label = genre.clone().unwrap_or_else(|| NO_GENRE_FOUND.to_string());

        EnrichedTrack {
            id: track.id,
            name: track.name,
            artist,
            genre,
            genre_label,
            archetype,
            preview_url: track.preview_url,
        }
    }
}
