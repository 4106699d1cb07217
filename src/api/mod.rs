pub mod auth;
pub mod middleware;
pub mod tracks;

pub use auth::auth_routes;
pub use tracks::track_routes;

use crate::config::Config;
use crate::error::AppError;
use crate::services::{AuthService, CharacterService};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub characters: Arc<CharacterService>,
}

pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(track_routes())
        .with_state(state)
        .route_service(
            "/",
            ServeFile::new(Path::new(&config.assets_dir).join("index.html")),
        )
        .nest_service("/assets", ServeDir::new(&config.assets_dir))
        .nest_service("/templates/css", ServeDir::new(&config.templates_css_dir))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("Page not found".to_string())
}
