use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credentials within this window of expiry are refreshed before use.
pub const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Access/refresh token pair issued by the provider for one user session.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(REFRESH_MARGIN_SECONDS)
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
