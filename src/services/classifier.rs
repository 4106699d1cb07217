use crate::models::Archetype;
use crate::services::taxonomy::GenreTaxonomy;
use std::sync::Arc;

/// Maps free-text genre strings onto a taxonomy archetype.
pub struct CharacterClassifier {
    taxonomy: Arc<GenreTaxonomy>,
}

impl CharacterClassifier {
    pub fn new(taxonomy: Arc<GenreTaxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Per-archetype match counts in taxonomy order.
    ///
    /// Each non-empty genre adds at most one point to every archetype that has a
    /// keyword contained in the lowercased genre.
    pub fn scores<S: AsRef<str>>(&self, genres: &[S]) -> Vec<(Archetype, u32)> {
        let entries = self.taxonomy.entries();
        let mut scores = vec![0u32; entries.len()];

        for genre in genres {
            let genre = genre.as_ref();
            if genre.is_empty() {
                continue;
            }
            tracing::debug!("Processing genre: {}", genre);

            let lowered = genre.to_lowercase();
            for (entry, score) in entries.iter().zip(scores.iter_mut()) {
                if entry.keywords.iter().any(|k| lowered.contains(k.as_str())) {
                    tracing::debug!("Matched genre '{}' with character '{}'", genre, entry.archetype);
                    *score += 1;
                }
            }
        }

        entries
            .iter()
            .map(|e| e.archetype.clone())
            .zip(scores)
            .collect()
    }

    /// Highest scoring archetype; ties go to the archetype declared first.
    /// Returns "Unknown Artist" when nothing matched.
    pub fn classify<S: AsRef<str>>(&self, genres: &[S]) -> Archetype {
        let mut best: Option<(Archetype, u32)> = None;

        for (archetype, score) in self.scores(genres) {
            if score == 0 {
                continue;
            }
            // strictly greater keeps the earliest archetype on ties
            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((archetype, score));
            }
        }

        match best {
            Some((archetype, score)) => {
                tracing::debug!("Classified character type: {} with score {}", archetype, score);
                archetype
            }
            None => {
                tracing::debug!("No matching genres found. Returning 'Unknown Artist'.");
                Archetype::unknown()
            }
        }
    }

    pub fn classify_genre(&self, genre: Option<&str>) -> Archetype {
        match genre {
            Some(genre) => self.classify(&[genre]),
            None => Archetype::unknown(),
        }
    }
}
