use crate::models::{EnrichedTrack, SessionCredential, TrackSummary};
use crate::services::classifier::CharacterClassifier;
use crate::services::provider::{MusicProvider, ProviderError};
use futures::future::join_all;
use std::sync::Arc;

/// Attaches a primary-artist genre and an archetype to each track.
pub struct TrackEnrichmentPipeline {
    provider: Arc<dyn MusicProvider>,
    classifier: Arc<CharacterClassifier>,
}

impl TrackEnrichmentPipeline {
    pub fn new(provider: Arc<dyn MusicProvider>, classifier: Arc<CharacterClassifier>) -> Self {
        Self {
            provider,
            classifier,
        }
    }

    /// Enrich a batch in input order. A failed artist lookup only costs that
    /// track its genre.
    pub async fn enrich(
        &self,
        tracks: Vec<TrackSummary>,
        credential: &SessionCredential,
    ) -> Vec<EnrichedTrack> {
        let lookups = tracks
            .iter()
            .map(|track| self.primary_genre(track, &credential.access_token));
        let genres = join_all(lookups).await;

        tracks
            .into_iter()
            .zip(genres)
            .map(|(track, genre)| {
                let archetype = self.classifier.classify_genre(genre.as_deref());
                EnrichedTrack::new(track, genre, archetype)
            })
            .collect()
    }

    /// First genre of the track's primary artist, with lookup errors logged
    /// and treated as "no genre".
    pub async fn primary_genre(&self, track: &TrackSummary, access_token: &str) -> Option<String> {
        match self.lookup_genre(track, access_token).await {
            Ok(genre) => genre,
            Err(e) => {
                tracing::warn!("Failed to fetch genre for track {}: {}", track.id, e);
                None
            }
        }
    }

    /// First genre of the track's primary artist. `Ok(None)` when the track has
    /// no artist or the artist has no genres.
    pub async fn lookup_genre(
        &self,
        track: &TrackSummary,
        access_token: &str,
    ) -> Result<Option<String>, ProviderError> {
        let Some(artist_ref) = track.primary_artist().filter(|a| !a.id.is_empty()) else {
            tracing::debug!("Track {} has no primary artist", track.id);
            return Ok(None);
        };

        let artist = self.provider.artist(access_token, &artist_ref.id).await?;
        Ok(artist.primary_genre().map(str::to_string))
    }
}
