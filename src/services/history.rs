use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value, json};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{info, warn};
use yup_oauth2::{AccessToken, ServiceAccountAuthenticator, ServiceAccountKey, read_service_account_key};

use crate::dto::history_dto::StoredRecord;
use crate::error::HistoryError;

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 500;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1/";

/// Long-term archive of finished drafts, keyed by draft id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Creates or overwrites the record stored under `id`.
    async fn save(&self, id: &str, record: &Value) -> Result<(), HistoryError>;

    /// Newest first, by `savedAt`.
    async fn list(&self, limit: u32) -> Result<Vec<StoredRecord>, HistoryError>;

    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, HistoryError>;

    /// Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool, HistoryError>;
}

fn saved_at(record: &Value) -> i64 {
    record
        .get("savedAt")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| Utc::now().timestamp_millis())
}

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS draft_history (
                id       TEXT PRIMARY KEY NOT NULL,
                saved_at INTEGER NOT NULL,
                body     TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save(&self, id: &str, record: &Value) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            INSERT INTO draft_history (id, saved_at, body)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                saved_at = excluded.saved_at,
                body = excluded.body
            "#,
        )
        .bind(id)
        .bind(saved_at(record))
        .bind(record.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<StoredRecord>, HistoryError> {
        let rows = sqlx::query("SELECT id, body FROM draft_history ORDER BY saved_at DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let body: String = row.try_get("body")?;
            match serde_json::from_str(&body) {
                Ok(record) => records.push(StoredRecord { id, record }),
                Err(e) => warn!("Skipping unreadable history record {}: {}", id, e),
            }
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, HistoryError> {
        let row = sqlx::query("SELECT body FROM draft_history WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row.try_get("body")?;
        Ok(Some(StoredRecord {
            id: id.to_string(),
            record: serde_json::from_str(&body)?,
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let result = sqlx::query("DELETE FROM draft_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// History kept in a Cloud Firestore collection through the REST API.
pub struct FirestoreHistoryStore {
    client: Client,
    key: ServiceAccountKey,
    token: Mutex<Option<AccessToken>>,
    documents: Url,
    collection: String,
}

impl FirestoreHistoryStore {
    pub async fn from_credentials(
        credentials: &Path,
        project_id: Option<&str>,
        collection: &str,
    ) -> Result<Self, HistoryError> {
        let key = read_service_account_key(credentials)
            .await
            .map_err(|e| HistoryError::Auth(format!("could not read {}: {}", credentials.display(), e)))?;

        let project_id = project_id
            .map(str::to_string)
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| HistoryError::Auth("no Firestore project id configured".into()))?;

        let documents = Url::parse(FIRESTORE_API)
            .and_then(|base| {
                base.join(&format!("projects/{project_id}/databases/(default)/documents/"))
            })
            .map_err(|e| HistoryError::Malformed(format!("bad Firestore url: {e}")))?;

        info!("Using Firestore project {} for draft history.", project_id);
        Ok(Self {
            client: Client::new(),
            key,
            token: Mutex::new(None),
            documents,
            collection: collection.to_string(),
        })
    }

    async fn bearer(&self) -> Result<String, HistoryError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            if let Some(value) = token.token() {
                return Ok(value.to_string());
            }
        }

        let auth = ServiceAccountAuthenticator::builder(self.key.clone())
            .build()
            .await
            .map_err(|e| HistoryError::Auth(e.to_string()))?;
        let token = auth
            .token(&[DATASTORE_SCOPE])
            .await
            .map_err(|e| HistoryError::Auth(e.to_string()))?;
        let value = token
            .token()
            .ok_or_else(|| HistoryError::Auth("token response carried no access token".into()))?
            .to_string();

        *cached = Some(token);
        Ok(value)
    }

    fn document_url(&self, id: &str) -> Result<Url, HistoryError> {
        let mut url = self.documents.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::Malformed("Firestore url cannot take segments".into()))?
            .pop_if_empty()
            .push(&self.collection)
            .push(id);
        Ok(url)
    }

    fn query_url(&self) -> Result<Url, HistoryError> {
        let mut url = self.documents.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::Malformed("Firestore url cannot take segments".into()))?
            .pop_if_empty();
        // `:runQuery` is a custom method on the documents resource
        let path = format!("{}:runQuery", url.path());
        url.set_path(&path);
        Ok(url)
    }
}

async fn rejected(response: reqwest::Response) -> HistoryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    HistoryError::Rejected { status, body }
}

fn document_record(document: &Value) -> Option<StoredRecord> {
    let id = document.get("name")?.as_str()?.rsplit('/').next()?.to_string();
    let fields = document.get("fields").cloned().unwrap_or_else(|| json!({}));
    Some(StoredRecord {
        id,
        record: from_fields(&fields),
    })
}

#[async_trait]
impl HistoryStore for FirestoreHistoryStore {
    async fn save(&self, id: &str, record: &Value) -> Result<(), HistoryError> {
        let Value::Object(map) = record else {
            return Err(HistoryError::Malformed("history record must be an object".into()));
        };

        let response = self
            .client
            .patch(self.document_url(id)?)
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "fields": to_fields(map) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<StoredRecord>, HistoryError> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "savedAt" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        });

        let response = self
            .client
            .post(self.query_url()?)
            .bearer_auth(self.bearer().await?)
            .json(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("document"))
            .filter_map(document_record)
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, HistoryError> {
        let response = self
            .client
            .get(self.document_url(id)?)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: Value = response.json().await?;
                document_record(&document)
                    .map(Some)
                    .ok_or_else(|| HistoryError::Malformed(format!("document {id} has no name")))
            }
            _ => Err(rejected(response).await),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let mut url = self.document_url(id)?;
        url.query_pairs_mut().append_pair("currentDocument.exists", "true");

        let response = self
            .client
            .delete(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(rejected(response).await),
        }
    }
}

/// JSON object → Firestore `fields` map.
pub fn to_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), to_firestore(value)))
            .collect(),
    )
}

pub fn to_firestore(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": to_fields(map) } }),
    }
}

/// Firestore `fields` map → JSON object.
pub fn from_fields(fields: &Value) -> Value {
    let Some(map) = fields.as_object() else {
        return json!({});
    };
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), from_firestore(value)))
            .collect(),
    )
}

pub fn from_firestore(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        // 64-bit integers travel as strings
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from)
            .unwrap_or(Value::Null),
        "doubleValue" => inner.as_f64().map(Value::from).unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(from_firestore).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => from_fields(inner.get("fields").unwrap_or(&Value::Null)),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite_history() -> SqliteHistoryStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("db");
        SqliteHistoryStore::new(pool).await.expect("history table")
    }

    #[tokio::test]
    async fn sqlite_history_lists_newest_first() {
        let history = sqlite_history().await;
        history
            .save("Draft1_AlphaVSBeta", &json!({"savedAt": 1_000, "n": 1}))
            .await
            .unwrap();
        history
            .save("Draft2_AlphaVSBeta", &json!({"savedAt": 2_000, "n": 2}))
            .await
            .unwrap();
        history
            .save("Draft3_AlphaVSBeta", &json!({"savedAt": 3_000, "n": 3}))
            .await
            .unwrap();

        let listed = history.list(2).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["Draft3_AlphaVSBeta", "Draft2_AlphaVSBeta"]);
    }

    #[tokio::test]
    async fn sqlite_history_overwrites_and_deletes() {
        let history = sqlite_history().await;
        history.save("Draft1_AVSB", &json!({"savedAt": 1, "v": "old"})).await.unwrap();
        history.save("Draft1_AVSB", &json!({"savedAt": 2, "v": "new"})).await.unwrap();

        let stored = history.get("Draft1_AVSB").await.unwrap().unwrap();
        assert_eq!(stored.record["v"], "new");

        assert!(history.delete("Draft1_AVSB").await.unwrap());
        assert!(!history.delete("Draft1_AVSB").await.unwrap());
        assert!(history.get("Draft1_AVSB").await.unwrap().is_none());
    }

    #[test]
    fn records_convert_to_firestore_fields_and_back() {
        let record = json!({
            "savedAt": 1_717_000_000_000_i64,
            "savedDate": "2024-05-29T16:26:40Z",
            "draftdata": {
                "timer_running": false,
                "Alpha": { "ban": [{"hero": "fanny"}], "pick": [{"name": ""}] }
            },
            "ratio": 0.5,
            "mvp": null
        });

        let fields = to_fields(record.as_object().unwrap());
        assert_eq!(fields["savedAt"], json!({"integerValue": "1717000000000"}));
        assert_eq!(
            fields["draftdata"]["mapValue"]["fields"]["timer_running"],
            json!({"booleanValue": false})
        );
        assert_eq!(fields["mvp"], json!({"nullValue": null}));

        assert_eq!(from_fields(&fields), record);
    }

    #[test]
    fn firestore_document_names_become_ids() {
        let document = json!({
            "name": "projects/zsml/databases/(default)/documents/MatchDraft/Draft2_AlphaVSBeta",
            "fields": { "savedAt": { "integerValue": "5" } }
        });
        let stored = document_record(&document).unwrap();
        assert_eq!(stored.id, "Draft2_AlphaVSBeta");
        assert_eq!(stored.record, json!({"savedAt": 5}));
    }

    #[test]
    fn unknown_firestore_values_read_as_null() {
        assert_eq!(from_firestore(&json!({"geoPointValue": {}})), Value::Null);
        assert_eq!(
            from_firestore(&json!({"arrayValue": {}})),
            json!([])
        );
    }
}
