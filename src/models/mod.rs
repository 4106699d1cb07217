pub mod archetype;
pub mod callback;
pub mod character;
pub mod credential;
pub mod track;

pub use archetype::Archetype;
pub use callback::CallbackQuery;
pub use character::{CharacterRecord, CharacterView, NewCharacter};
pub use credential::SessionCredential;
pub use track::{Artist, ArtistRef, EnrichedTrack, TrackSummary, NO_GENRE_FOUND};
