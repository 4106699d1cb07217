use crate::error::AppError;
use crate::models::{Artist, SessionCredential, TrackSummary};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("authorization rejected: {0}")]
    Unauthorized(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ProviderError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderError::Unauthorized(_))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthorized(msg) => AppError::Auth(msg),
            other => AppError::Provider(other.to_string()),
        }
    }
}

/// Streaming-music provider operations the service depends on.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// URL the user is sent to in order to grant access. `state` is echoed back
    /// on the callback.
    fn authorize_url(&self, state: &str) -> Result<String, ProviderError>;

    async fn exchange_code(&self, code: &str) -> Result<SessionCredential, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<SessionCredential, ProviderError>;

    async fn top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<TrackSummary>, ProviderError>;

    async fn track(&self, access_token: &str, track_id: &str)
        -> Result<TrackSummary, ProviderError>;

    async fn artist(&self, access_token: &str, artist_id: &str) -> Result<Artist, ProviderError>;
}
