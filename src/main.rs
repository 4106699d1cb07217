mod api;
mod config;
mod error;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{
    AuthService, CharacterCatalog, CharacterClassifier, CharacterService, GenreTaxonomy,
    MusicProvider, SpotifyClient, TokenManager, DEFAULT_CHARACTERS,
};
use axum::http::{HeaderValue, Method};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,genre_characters=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // A broken genre mapping is fatal
    let taxonomy = Arc::new(GenreTaxonomy::load(&config.genre_mapping_path)?);

    // Connect to database
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    let catalog = CharacterCatalog::new(db.clone());
    if config.catalog_reset_on_start {
        catalog.reset_and_seed(DEFAULT_CHARACTERS).await?;
    } else {
        catalog.seed_if_empty(DEFAULT_CHARACTERS).await?;
    }
    tracing::info!("Character catalog holds {} records", catalog.count().await?);

    // Initialize services
    let spotify: Arc<dyn MusicProvider> = Arc::new(SpotifyClient::new(&config)?);
    let classifier = Arc::new(CharacterClassifier::new(taxonomy));
    let token_manager = Arc::new(TokenManager::new(spotify.clone()));

    // Sweep abandoned logins and idle sessions
    let sweeper = token_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            sweeper.prune_stale(chrono::Utc::now()).await;
        }
    });
    let characters = Arc::new(CharacterService::new(
        token_manager,
        spotify,
        classifier,
        catalog,
        config.top_tracks_limit,
    ));

    let app_state = Arc::new(AppState {
        auth_service: Arc::new(AuthService::new(&config)),
        characters,
    });

    // Build router
    let app = api::router(app_state, &config).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors_layer(&config.cors_origins)),
    );

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
}
