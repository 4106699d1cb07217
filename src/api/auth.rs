use crate::api::middleware::MaybeSession;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::CallbackQuery;
use crate::services::auth::{expired_session_cookie, session_cookie};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use validator::Validate;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

async fn login(
    State(state): State<Arc<AppState>>,
    MaybeSession(existing): MaybeSession,
) -> Result<Response> {
    let (session_id, new_token) = match existing {
        Some(session_id) => (session_id, None),
        None => {
            let (session_id, token) = state.auth_service.issue_session()?;
            (session_id, Some(token))
        }
    };

    let authorize_url = state.characters.initiate_login(session_id).await?;
    let mut response = Redirect::to(&authorize_url).into_response();

    if let Some(token) = new_token {
        let cookie = HeaderValue::from_str(&session_cookie(&token))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

async fn callback(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session_id = session.ok_or_else(|| AppError::Auth("Missing session cookie".to_string()))?;

    if let Some(error) = query.error {
        state.characters.abandon_login(session_id).await;
        return Err(AppError::Auth(format!("Authorization denied: {}", error)));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    state
        .characters
        .complete_login(session_id, &code, query.state.as_deref())
        .await?;

    Ok(Redirect::to("/top-songs"))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
) -> impl IntoResponse {
    if let Some(session_id) = session {
        state.characters.logout(session_id).await;
    }

    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
}
