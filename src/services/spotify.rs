use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Artist, ArtistRef, SessionCredential, TrackSummary};
use crate::services::provider::{MusicProvider, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

impl TokenResponse {
    /// Spotify may omit the refresh token on refresh; the previous one stays valid.
    fn into_credential(
        self,
        previous_refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<SessionCredential, ProviderError> {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string))
            .ok_or_else(|| ProviderError::Parse("token response has no refresh_token".into()))?;

        Ok(SessionCredential {
            access_token: self.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(self.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TopTracksPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtistRef {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    // local files have no id
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtistRef>,
    preview_url: Option<String>,
}

impl SpotifyTrack {
    fn into_summary(self) -> Option<TrackSummary> {
        Some(TrackSummary {
            id: self.id?,
            name: self.name,
            artists: self
                .artists
                .into_iter()
                .map(|a| ArtistRef {
                    id: a.id.unwrap_or_default(),
                    name: a.name,
                })
                .collect(),
            preview_url: self.preview_url,
        })
    }
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.provider_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            scope: config.spotify_scope.clone(),
            client,
        })
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
    ) -> std::result::Result<TokenResponse, ProviderError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify token endpoint error: {} - {}", status, body);
            // invalid_grant and bad client credentials come back as 400/401
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    ProviderError::Unauthorized(format!("{} - {}", status, body))
                }
                _ => ProviderError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse token response: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, ProviderError> {
        let url = format!("{}{}", API_BASE, path);
        tracing::debug!("Spotify request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized(format!(
                "access token rejected for {}",
                path
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify API error: {} - {}", status, body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            ProviderError::Parse(format!("{} - Response: {}", e, preview))
        })
    }
}

#[async_trait]
impl MusicProvider for SpotifyClient {
    fn authorize_url(&self, state: &str) -> std::result::Result<String, ProviderError> {
        build_authorize_url(&self.client_id, &self.redirect_uri, &self.scope, state)
    }

    async fn exchange_code(&self, code: &str) -> std::result::Result<SessionCredential, ProviderError> {
        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        token.into_credential(None, Utc::now())
    }

    async fn refresh(&self, refresh_token: &str) -> std::result::Result<SessionCredential, ProviderError> {
        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        token.into_credential(Some(refresh_token), Utc::now())
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> std::result::Result<Vec<TrackSummary>, ProviderError> {
        let limit = limit.clamp(1, 50);
        let page: TopTracksPage = self
            .get_json(access_token, "/me/top/tracks", &[("limit", limit.to_string())])
            .await?;

        tracing::debug!("Found {} top tracks", page.items.len());
        Ok(page
            .items
            .into_iter()
            .filter_map(SpotifyTrack::into_summary)
            .collect())
    }

    async fn track(
        &self,
        access_token: &str,
        track_id: &str,
    ) -> std::result::Result<TrackSummary, ProviderError> {
        let track: SpotifyTrack = self
            .get_json(access_token, &format!("/tracks/{}", track_id), &[])
            .await?;

        track
            .into_summary()
            .ok_or_else(|| ProviderError::Parse(format!("track {} has no id", track_id)))
    }

    async fn artist(
        &self,
        access_token: &str,
        artist_id: &str,
    ) -> std::result::Result<Artist, ProviderError> {
        self.get_json(access_token, &format!("/artists/{}", artist_id), &[])
            .await
    }
}

fn build_authorize_url(
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> std::result::Result<String, ProviderError> {
    let url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("scope", scope),
            ("state", state),
        ],
    )
    .map_err(|e| ProviderError::Parse(format!("Invalid authorize URL: {}", e)))?;

    Ok(url.to_string())
}
