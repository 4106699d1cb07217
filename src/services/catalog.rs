use crate::error::Result;
use crate::models::{Archetype, CharacterRecord, NewCharacter};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Demo characters loaded at startup.
pub const DEFAULT_CHARACTERS: &[NewCharacter] = &[
    NewCharacter { name: "Rock Rebel", image_url: "character1.png", archetype: "Rocker" },
    NewCharacter { name: "Pop Princess", image_url: "character2.png", archetype: "Pop Star" },
    NewCharacter { name: "Soul Sister", image_url: "character3.png", archetype: "Soulful Singer" },
    NewCharacter { name: "Hip Hop Hero", image_url: "character4.png", archetype: "Hip Hop Artist" },
    NewCharacter { name: "Folk Troubadour", image_url: "character5.png", archetype: "Folk Musician" },
];

const CREATE_CHARACTERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS characters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        image_url TEXT NOT NULL,
        archetype TEXT NOT NULL
    )
"#;

/// Sample character records keyed by archetype.
#[derive(Clone)]
pub struct CharacterCatalog {
    db: SqlitePool,
}

impl CharacterCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Drop whatever the catalog held and replace it with `records`.
    pub async fn reset_and_seed(&self, records: &[NewCharacter]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DROP TABLE IF EXISTS characters")
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_CHARACTERS_TABLE)
            .execute(&mut *tx)
            .await?;
        insert_all(&mut tx, records).await?;

        tx.commit().await?;
        tracing::info!("Character catalog reset with {} records", records.len());
        Ok(())
    }

    /// Seed only when the catalog is empty. Returns whether anything was inserted.
    pub async fn seed_if_empty(&self, records: &[NewCharacter]) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query(CREATE_CHARACTERS_TABLE)
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM characters")
            .fetch_one(&mut *tx)
            .await?;

        if existing > 0 {
            tracing::info!("Character catalog already holds {} records, not seeding", existing);
            tx.commit().await?;
            return Ok(false);
        }

        insert_all(&mut tx, records).await?;
        tx.commit().await?;
        tracing::info!("Seeded empty character catalog with {} records", records.len());
        Ok(true)
    }

    /// A uniformly random record for `archetype`, or `None` if it has none.
    pub async fn pick_by_archetype(&self, archetype: &Archetype) -> Result<Option<CharacterRecord>> {
        let record = sqlx::query_as::<_, CharacterRecord>(
            "SELECT name, image_url, archetype FROM characters WHERE archetype = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(archetype.as_str())
        .fetch_optional(&self.db)
        .await?;

        if record.is_none() {
            tracing::debug!("No character found for archetype '{}'", archetype);
        }

        Ok(record)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM characters")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

async fn insert_all(tx: &mut Transaction<'_, Sqlite>, records: &[NewCharacter]) -> Result<()> {
    for record in records {
        sqlx::query("INSERT INTO characters (name, image_url, archetype) VALUES (?, ?, ?)")
            .bind(record.name)
            .bind(record.image_url)
            .bind(record.archetype)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
