use crate::api::middleware::RequireSession;
use crate::api::AppState;
use crate::error::Result;
use crate::models::{CharacterView, EnrichedTrack};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub fn track_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/top-songs", get(top_songs))
        .route("/character/:track_id", get(character))
}

async fn top_songs(
    State(state): State<Arc<AppState>>,
    RequireSession(session_id): RequireSession,
) -> Result<Json<Vec<EnrichedTrack>>> {
    let tracks = state.characters.top_tracks_enriched(session_id).await?;
    Ok(Json(tracks))
}

async fn character(
    State(state): State<Arc<AppState>>,
    RequireSession(session_id): RequireSession,
    Path(track_id): Path<String>,
) -> Result<Json<CharacterView>> {
    let view = state
        .characters
        .character_for_track(session_id, &track_id)
        .await?;
    Ok(Json(view))
}
