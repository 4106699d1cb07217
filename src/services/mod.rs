pub mod auth;
pub mod catalog;
pub mod characters;
pub mod classifier;
pub mod enrichment;
pub mod provider;
pub mod spotify;
pub mod taxonomy;
pub mod token_manager;

pub use auth::AuthService;
pub use catalog::{CharacterCatalog, DEFAULT_CHARACTERS};
pub use characters::CharacterService;
pub use classifier::CharacterClassifier;
pub use provider::MusicProvider;
pub use spotify::SpotifyClient;
pub use taxonomy::GenreTaxonomy;
pub use token_manager::TokenManager;
