use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_scope: String,
    pub session_secret: String,
    pub database_url: String,
    /// JSON file mapping archetype names to genre keyword fragments
    pub genre_mapping_path: String,
    pub assets_dir: String,
    pub templates_css_dir: String,
    pub server_host: String,
    pub server_port: u16,
    /// How many top tracks to request for the top-songs view
    pub top_tracks_limit: u32,
    /// Upper bound on every outbound provider request
    pub provider_timeout_secs: u64,
    /// Drop and reseed the character catalog on startup. When false the seed
    /// list is only inserted into an empty catalog.
    pub catalog_reset_on_start: bool,
    /// Allowed CORS origins (comma-separated). Use "*" for any origin (development only).
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let spotify_client_id = env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("SPOTIFY_CLIENT_ID environment variable must be set"))?;
        let spotify_client_secret = env::var("SPOTIFY_CLIENT_SECRET").map_err(|_| {
            anyhow::anyhow!("SPOTIFY_CLIENT_SECRET environment variable must be set")
        })?;

        // SESSION_SECRET is required - no insecure defaults
        let session_secret = env::var("SESSION_SECRET").map_err(|_| {
            anyhow::anyhow!(
                "SESSION_SECRET environment variable must be set. \
                Generate a secure secret with: openssl rand -base64 32"
            )
        })?;

        if session_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "SESSION_SECRET must be at least 32 characters long. \
                Generate a secure secret with: openssl rand -base64 32"
            ));
        }

        let cors_origins = parse_list(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
        );

        Ok(Config {
            spotify_client_id,
            spotify_client_secret,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|_| "http://127.0.0.1:5000/callback".to_string()),
            spotify_scope: env::var("SPOTIFY_SCOPE")
                .unwrap_or_else(|_| "user-top-read".to_string()),
            session_secret,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://characters.db?mode=rwc".to_string()),
            genre_mapping_path: env::var("GENRE_MAPPING_PATH")
                .unwrap_or_else(|_| "genre_character_mapping.json".to_string()),
            assets_dir: env::var("ASSETS_DIR").unwrap_or_else(|_| "assets".to_string()),
            templates_css_dir: env::var("TEMPLATES_CSS_DIR")
                .unwrap_or_else(|_| "templates/css".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            top_tracks_limit: env::var("TOP_TRACKS_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            catalog_reset_on_start: env::var("CATALOG_RESET_ON_START")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            cors_origins,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
