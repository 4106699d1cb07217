//! Fixtures shared by unit tests.

use crate::models::{Artist, ArtistRef, SessionCredential, TrackSummary};
use crate::services::provider::{MusicProvider, ProviderError};
use crate::services::taxonomy::GenreTaxonomy;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SAMPLE_TAXONOMY: &str = r#"{
    "Rocker": ["rock", "metal", "punk"],
    "Pop Star": ["pop", "dance"],
    "Soulful Singer": ["soul", "r&b"],
    "Hip Hop Artist": ["hip hop", "rap", "trap", "drill"],
    "Folk Musician": ["folk", "acoustic"]
}"#;

pub fn sample_taxonomy() -> Arc<GenreTaxonomy> {
    Arc::new(GenreTaxonomy::from_json(SAMPLE_TAXONOMY).unwrap())
}

/// Single-connection pool so every query sees the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub fn credential_expiring_in(access_token: &str, seconds: i64) -> SessionCredential {
    SessionCredential {
        access_token: access_token.to_string(),
        refresh_token: format!("{}-refresh", access_token),
        expires_at: Utc::now() + Duration::seconds(seconds),
    }
}

pub fn track(id: &str, name: &str, artist_id: &str) -> TrackSummary {
    TrackSummary {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![ArtistRef {
            id: artist_id.to_string(),
            name: format!("Artist {}", artist_id),
        }],
        preview_url: None,
    }
}

pub fn artist(id: &str, genres: &[&str]) -> Artist {
    Artist {
        id: id.to_string(),
        name: format!("Artist {}", id),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

/// Pulls the `state` query value out of an authorize URL.
pub fn oauth_state_from(url: &str) -> String {
    url.split("state=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .unwrap()
        .to_string()
}

#[derive(Default)]
pub struct MockProvider {
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub artist_calls: AtomicUsize,
    pub fail_exchange: AtomicBool,
    pub fail_refresh: AtomicBool,
    /// Data calls answer as if the access token was revoked
    pub reject_access: AtomicBool,
    pub refresh_delay_ms: AtomicU64,
    exchange_result: Mutex<Option<SessionCredential>>,
    top_tracks: Mutex<Vec<TrackSummary>>,
    artists: Mutex<HashMap<String, Artist>>,
    failing_artists: Mutex<HashSet<String>>,
}

impl MockProvider {
    pub fn set_exchange_result(&self, credential: SessionCredential) {
        *self.exchange_result.lock().unwrap() = Some(credential);
    }

    pub fn add_top_track(&self, track: TrackSummary) {
        self.top_tracks.lock().unwrap().push(track);
    }

    pub fn add_artist(&self, artist: Artist) {
        self.artists
            .lock()
            .unwrap()
            .insert(artist.id.clone(), artist);
    }

    pub fn fail_artist(&self, artist_id: &str) {
        self.failing_artists
            .lock()
            .unwrap()
            .insert(artist_id.to_string());
    }

    fn check_access(&self) -> Result<(), ProviderError> {
        if self.reject_access.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized("token revoked".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MusicProvider for MockProvider {
    fn authorize_url(&self, state: &str) -> Result<String, ProviderError> {
        Ok(format!("https://accounts.example/authorize?state={}", state))
    }

    async fn exchange_code(&self, _code: &str) -> Result<SessionCredential, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized("invalid_grant".into()));
        }

        let configured = self.exchange_result.lock().unwrap().clone();
        Ok(configured.unwrap_or_else(|| credential_expiring_in("exchanged", 3600)))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<SessionCredential, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized("refresh token revoked".into()));
        }
        Ok(credential_expiring_in("refreshed", 3600))
    }

    async fn top_tracks(
        &self,
        _access_token: &str,
        limit: u32,
    ) -> Result<Vec<TrackSummary>, ProviderError> {
        self.check_access()?;
        let tracks = self.top_tracks.lock().unwrap();
        Ok(tracks.iter().take(limit as usize).cloned().collect())
    }

    async fn track(&self, _access_token: &str, track_id: &str) -> Result<TrackSummary, ProviderError> {
        self.check_access()?;
        self.top_tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: "non existing id".into(),
            })
    }

    async fn artist(&self, _access_token: &str, artist_id: &str) -> Result<Artist, ProviderError> {
        self.artist_calls.fetch_add(1, Ordering::SeqCst);
        self.check_access()?;

        if self.failing_artists.lock().unwrap().contains(artist_id) {
            return Err(ProviderError::Request("connection reset".into()));
        }

        self.artists
            .lock()
            .unwrap()
            .get(artist_id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: "non existing id".into(),
            })
    }
}

pub fn test_config() -> crate::config::Config {
    crate::config::Config {
        spotify_client_id: "client".into(),
        spotify_client_secret: "secret".into(),
        spotify_redirect_uri: "http://127.0.0.1:5000/callback".into(),
        spotify_scope: "user-top-read".into(),
        session_secret: "0123456789abcdef0123456789abcdef".into(),
        database_url: "sqlite::memory:".into(),
        genre_mapping_path: "genre_character_mapping.json".into(),
        assets_dir: "assets".into(),
        templates_css_dir: "templates/css".into(),
        server_host: "127.0.0.1".into(),
        server_port: 5000,
        top_tracks_limit: 5,
        provider_timeout_secs: 10,
        catalog_reset_on_start: true,
        cors_origins: vec!["*".into()],
    }
}
