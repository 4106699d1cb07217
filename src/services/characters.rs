use crate::error::{AppError, Result};
use crate::models::{
    CharacterRecord, CharacterView, EnrichedTrack, SessionCredential, NO_GENRE_FOUND,
};
use crate::services::catalog::CharacterCatalog;
use crate::services::classifier::CharacterClassifier;
use crate::services::enrichment::TrackEnrichmentPipeline;
use crate::services::provider::{MusicProvider, ProviderError};
use crate::services::token_manager::TokenManager;
use std::sync::Arc;
use uuid::Uuid;

/// Operations behind the login, top-songs and character endpoints.
pub struct CharacterService {
    tokens: Arc<TokenManager>,
    provider: Arc<dyn MusicProvider>,
    pipeline: TrackEnrichmentPipeline,
    classifier: Arc<CharacterClassifier>,
    catalog: CharacterCatalog,
    top_tracks_limit: u32,
}

impl CharacterService {
    pub fn new(
        tokens: Arc<TokenManager>,
        provider: Arc<dyn MusicProvider>,
        classifier: Arc<CharacterClassifier>,
        catalog: CharacterCatalog,
        top_tracks_limit: u32,
    ) -> Self {
        Self {
            tokens,
            pipeline: TrackEnrichmentPipeline::new(provider.clone(), classifier.clone()),
            provider,
            classifier,
            catalog,
            top_tracks_limit,
        }
    }

    pub async fn initiate_login(&self, session_id: Uuid) -> Result<String> {
        self.tokens.begin_login(session_id).await
    }

    pub async fn complete_login(
        &self,
        session_id: Uuid,
        code: &str,
        state: Option<&str>,
    ) -> Result<SessionCredential> {
        self.tokens.complete_login(session_id, code, state).await
    }

    /// The user declined access or the provider reported an error on callback.
    pub async fn abandon_login(&self, session_id: Uuid) {
        self.tokens.invalidate(session_id).await;
    }

    pub async fn logout(&self, session_id: Uuid) {
        self.tokens.end_session(session_id).await;
    }

    pub async fn top_tracks_enriched(&self, session_id: Uuid) -> Result<Vec<EnrichedTrack>> {
        let credential = self
            .tokens
            .get_token(session_id)
            .await
            .ok_or(AppError::NeedsLogin)?;

        let tracks = match self
            .provider
            .top_tracks(&credential.access_token, self.top_tracks_limit)
            .await
        {
            Ok(tracks) => tracks,
            Err(e) => return Err(self.provider_failure(session_id, e).await),
        };
        tracing::debug!("Fetched {} top tracks for session {}", tracks.len(), session_id);

        Ok(self.pipeline.enrich(tracks, &credential).await)
    }

    /// Track name, resolved genre and a random catalog character for that
    /// genre's archetype. Repeated calls keep genre and archetype but may pick
    /// a different character.
    pub async fn character_for_track(&self, session_id: Uuid, track_id: &str) -> Result<CharacterView> {
        validate_track_id(track_id)?;

        let credential = self
            .tokens
            .get_token(session_id)
            .await
            .ok_or(AppError::NeedsLogin)?;
        let access_token = credential.access_token.as_str();

        let track = match self.provider.track(access_token, track_id).await {
            Ok(track) => track,
            Err(e) => return Err(self.provider_failure(session_id, e).await),
        };

        let genre = match self.pipeline.lookup_genre(&track, access_token).await {
            Ok(genre) => genre,
            Err(e) => return Err(self.provider_failure(session_id, e).await),
        };

        let archetype = self.classifier.classify_genre(genre.as_deref());
        let record = self.catalog.pick_by_archetype(&archetype).await?;
        let genre = genre.unwrap_or_else(|| NO_GENRE_FOUND.to_string());

        Ok(CharacterView {
            track_id: track.id,
            track_name: track.name,
            character_type: title_case(&genre),
            genre,
            found: record.is_some(),
            character: record.unwrap_or_else(|| CharacterRecord::placeholder(archetype.clone())),
            archetype,
        })
    }

    async fn provider_failure(&self, session_id: Uuid, err: ProviderError) -> AppError {
        if err.is_unauthorized() {
            self.tokens.invalidate(session_id).await;
        }
        err.into()
    }
}

fn validate_track_id(track_id: &str) -> Result<()> {
    if track_id.is_empty() || track_id.len() > 64 || !track_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!("Invalid track id: {}", track_id)));
    }
    Ok(())
}

/// Capitalise the first letter of every alphabetic run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}
