use crate::error::{AppError, Result};
use crate::models::{archetype::UNKNOWN_ARTIST, Archetype};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyEntry {
    pub archetype: Archetype,
    /// Lowercase fragments matched as substrings of a genre string
    pub keywords: Vec<String>,
}

/// Ordered archetype → keyword table.
///
/// Entry order is the declaration order of the source document and is the
/// order used to break classification ties.
#[derive(Debug, Clone)]
pub struct GenreTaxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl GenreTaxonomy {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read genre mapping {}: {}",
                path.display(),
                e
            ))
        })?;

        let taxonomy = Self::from_json(&raw)?;
        tracing::info!(
            "Loaded {} archetypes from {}",
            taxonomy.len(),
            path.display()
        );
        Ok(taxonomy)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Genre mapping is not valid JSON: {}", e)))?;

        let object = value.as_object().ok_or_else(|| {
            AppError::Config("Genre mapping must be a JSON object of archetype -> keywords".into())
        })?;

        let mut entries = Vec::with_capacity(object.len());
        for (name, keywords) in object {
            if name.trim().is_empty() || name == UNKNOWN_ARTIST {
                return Err(AppError::Config(format!(
                    "Invalid archetype name '{}' in genre mapping",
                    name
                )));
            }

            let list = keywords.as_array().ok_or_else(|| {
                AppError::Config(format!(
                    "Archetype '{}' must map to an array of strings",
                    name
                ))
            })?;

            let keywords = list
                .iter()
                .map(|keyword| match keyword.as_str().map(str::to_lowercase) {
                    Some(k) if !k.is_empty() => Ok(k),
                    _ => Err(AppError::Config(format!(
                        "Archetype '{}' has a keyword that is not a non-empty string: {}",
                        name, keyword
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;

            if keywords.is_empty() {
                return Err(AppError::Config(format!(
                    "Archetype '{}' has no keywords",
                    name
                )));
            }

            entries.push(TaxonomyEntry {
                archetype: Archetype::new(name.as_str()),
                keywords,
            });
        }

        if entries.is_empty() {
            return Err(AppError::Config(
                "Genre mapping must declare at least one archetype".into(),
            ));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.entries.iter().map(|e| &e.archetype)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
