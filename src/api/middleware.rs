use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::services::auth::SESSION_COOKIE;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

/// Session id from a valid session cookie, if the request carries one.
pub struct MaybeSession(pub Option<Uuid>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let session_id = session_token(parts)
            .and_then(|token| state.auth_service.verify_token(token))
            .map(|claims| claims.sub);

        Ok(MaybeSession(session_id))
    }
}

/// Rejects with a redirect to the login flow when there is no session.
pub struct RequireSession(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let MaybeSession(session_id) = match MaybeSession::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };

        session_id.map(RequireSession).ok_or(AppError::NeedsLogin)
    }
}

fn session_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}
