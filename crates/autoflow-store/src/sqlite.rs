use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{PendingKey, PendingTrigger, PendingTriggerStore, StoreError};

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database at `url` and run migrations.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl PendingTriggerStore for SqliteStore {
  async fn find_one(&self, key: &PendingKey) -> Result<Option<PendingTrigger>, StoreError> {
    let record = sqlx::query_as(
      r#"
      SELECT workflow_key, match_key, match_key_value, triggered_conditions, event_data, created_at, updated_at
      FROM pending_triggers
      WHERE workflow_key = ? AND match_key = ? AND match_key_value = ?
      "#,
    )
    .bind(&key.workflow_key)
    .bind(&key.match_key)
    .bind(&key.match_key_value)
    .fetch_optional(&self.pool)
    .await?;

    Ok(record)
  }

  async fn upsert(&self, record: &PendingTrigger) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO pending_triggers
        (workflow_key, match_key, match_key_value, triggered_conditions, event_data, created_at, updated_at)
      VALUES (?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT (workflow_key, match_key, match_key_value) DO UPDATE SET
        triggered_conditions = excluded.triggered_conditions,
        event_data = excluded.event_data,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(&record.workflow_key)
    .bind(&record.match_key)
    .bind(&record.match_key_value)
    .bind(&record.triggered_conditions)
    .bind(&record.event_data)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn delete_one(&self, key: &PendingKey) -> Result<bool, StoreError> {
    let result = sqlx::query(
      r#"
      DELETE FROM pending_triggers
      WHERE workflow_key = ? AND match_key = ? AND match_key_value = ?
      "#,
    )
    .bind(&key.workflow_key)
    .bind(&key.match_key)
    .bind(&key.match_key_value)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() > 0)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use serde_json::{Map, json};

  use super::*;

  async fn store() -> SqliteStore {
    // One connection, otherwise every pooled connection gets its own in-memory database.
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .unwrap();
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();
    store
  }

  fn key() -> PendingKey {
    PendingKey::new("LabResults", "labReportId", "25G3917")
  }

  #[tokio::test]
  async fn test_round_trip_and_delete() {
    let store = store().await;
    assert!(store.find_one(&key()).await.unwrap().is_none());

    let mut event_data = Map::new();
    event_data.insert("pdf".into(), json!({ "files": ["Report_25G3917.pdf"] }));
    let record = PendingTrigger::new(&key(), vec!["pdf".into()], event_data.clone());
    store.upsert(&record).await.unwrap();

    let found = store.find_one(&key()).await.unwrap().unwrap();
    assert_eq!(found.triggered_conditions.0, vec!["pdf"]);
    assert_eq!(found.event_data.0, event_data);
    assert_eq!(found.key(), key());

    assert!(store.delete_one(&key()).await.unwrap());
    assert!(!store.delete_one(&key()).await.unwrap());
    assert!(store.find_one(&key()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_upsert_replaces_state_and_keeps_created_at() {
    let store = store().await;
    let first = PendingTrigger::new(&key(), vec!["pdf".into()], Map::new());
    store.upsert(&first).await.unwrap();

    let mut second = PendingTrigger::new(&key(), vec!["pdf".into(), "email".into()], Map::new());
    second.created_at = first.created_at + Duration::hours(2);
    second.updated_at = first.updated_at + Duration::hours(2);
    store.upsert(&second).await.unwrap();

    let found = store.find_one(&key()).await.unwrap().unwrap();
    assert_eq!(found.triggered_conditions.0, vec!["pdf", "email"]);
    assert_eq!(found.created_at, first.created_at);
    assert_eq!(found.updated_at, second.updated_at);
  }

  #[tokio::test]
  async fn test_connect_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("autoflow.db").display());

    let store = SqliteStore::connect(&url).await.unwrap();
    store
      .upsert(&PendingTrigger::new(&key(), vec!["pdf".into()], Map::new()))
      .await
      .unwrap();

    assert!(dir.path().join("autoflow.db").exists());
  }
}
