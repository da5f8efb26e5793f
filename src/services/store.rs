use std::str::FromStr;

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{info, warn};

use crate::dto::{draft_dto::DraftEnvelope, match_dto::MatchData};
use crate::error::StoreError;

/// One whole-document slot in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    MatchData,
    Draft,
    PreviousDraft,
    MapDraw,
    Postgame,
    Mvp,
    Notification,
    Schedule,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::MatchData,
        Domain::Draft,
        Domain::PreviousDraft,
        Domain::MapDraw,
        Domain::Postgame,
        Domain::Mvp,
        Domain::Notification,
        Domain::Schedule,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Domain::MatchData => "matchdata",
            Domain::Draft => "matchdraft",
            Domain::PreviousDraft => "previousmatchdraft",
            Domain::MapDraw => "mapdraw",
            Domain::Postgame => "postgame",
            Domain::Mvp => "mvpdata",
            Domain::Notification => "notification",
            Domain::Schedule => "schedule",
        }
    }

    /// What a fresh install serves, and what a corrupt document falls back to.
    pub fn default_document(self) -> Value {
        match self {
            Domain::MatchData => serde_json::to_value(MatchData::default()).unwrap_or_default(),
            Domain::Draft | Domain::PreviousDraft => {
                serde_json::to_value(DraftEnvelope::default()).unwrap_or_default()
            }
            Domain::MapDraw => json!({
                "drawdata": {
                    "status": "idle",
                    "mode": "random",
                    "fixedChoice": null,
                    "result": null,
                    "timestamp": 0
                }
            }),
            Domain::Postgame => json!([]),
            Domain::Mvp => json!({ "mvp": null }),
            Domain::Notification => json!({ "currentVideo": null, "timestamp": 0 }),
            Domain::Schedule => {
                let entry = json!({
                    "show": false,
                    "time": "",
                    "logo1": "",
                    "team1": "",
                    "score1": "",
                    "logo2": "",
                    "team2": "",
                    "score2": ""
                });
                json!({ "1": entry, "2": entry, "3": entry, "4": entry })
            }
        }
    }
}

/// SQLite-backed document store; one row per [`Domain`], replaced whole on
/// every write.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every connection to a plain in-memory url would see its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                domain     TEXT PRIMARY KEY NOT NULL,
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Writes the default document for every domain that has none yet.
    pub async fn seed_defaults(&self) -> Result<(), StoreError> {
        for domain in Domain::ALL {
            let body = domain.default_document().to_string();
            let result = sqlx::query(
                "INSERT OR IGNORE INTO documents (domain, body, updated_at) VALUES (?, ?, ?)",
            )
            .bind(domain.key())
            .bind(body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Write {
                domain: domain.key(),
                source,
            })?;

            if result.rows_affected() > 0 {
                info!("Seeded default {} document.", domain.key());
            }
        }
        Ok(())
    }

    async fn raw(&self, domain: Domain) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE domain = ?")
            .bind(domain.key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Read {
                domain: domain.key(),
                source,
            })?;

        row.map(|row| row.try_get::<String, _>("body"))
            .transpose()
            .map_err(|source| StoreError::Read {
                domain: domain.key(),
                source,
            })
    }

    /// The stored document, or the domain default when it is missing or not
    /// valid JSON.
    pub async fn get(&self, domain: Domain) -> Result<Value, StoreError> {
        let Some(body) = self.raw(domain).await? else {
            return Ok(domain.default_document());
        };

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Stored {} document is corrupt ({}), serving default.", domain.key(), e);
                Ok(domain.default_document())
            }
        }
    }

    /// Typed read. A document that does not fit `T` is treated like a corrupt
    /// one.
    pub async fn get_or_default<T>(&self, domain: Domain) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let Some(body) = self.raw(domain).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Stored {} document is unreadable ({}), using default.", domain.key(), e);
                Ok(T::default())
            }
        }
    }

    pub async fn set(&self, domain: Domain, document: &Value) -> Result<(), StoreError> {
        self.write(domain, document.to_string()).await
    }

    pub async fn set_as<T: Serialize>(&self, domain: Domain, document: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string(document).map_err(|source| StoreError::Encode {
            domain: domain.key(),
            source,
        })?;
        self.write(domain, body).await
    }

    async fn write(&self, domain: Domain, body: String) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (domain, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(domain) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(domain.key())
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|source| StoreError::Write {
            domain: domain.key(),
            source,
        })?;

        Ok(())
    }

    /// Stores raw text as-is, bypassing serialization.
    #[cfg(test)]
    pub(crate) async fn write_raw(&self, domain: Domain, body: &str) -> Result<(), StoreError> {
        self.write(domain, body.to_string()).await
    }
}
