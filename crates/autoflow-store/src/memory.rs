use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{PendingKey, PendingTrigger, PendingTriggerStore, StoreError};

/// Process-local store. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
  records: RwLock<HashMap<PendingKey, PendingTrigger>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.records.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.records.read().await.is_empty()
  }
}

#[async_trait]
impl PendingTriggerStore for MemoryStore {
  async fn find_one(&self, key: &PendingKey) -> Result<Option<PendingTrigger>, StoreError> {
    Ok(self.records.read().await.get(key).cloned())
  }

  async fn upsert(&self, record: &PendingTrigger) -> Result<(), StoreError> {
    let mut records = self.records.write().await;
    let mut record = record.clone();
    if let Some(existing) = records.get(&record.key()) {
      record.created_at = existing.created_at;
    }
    records.insert(record.key(), record);
    Ok(())
  }

  async fn delete_one(&self, key: &PendingKey) -> Result<bool, StoreError> {
    Ok(self.records.write().await.remove(key).is_some())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use serde_json::{Map, json};

  use super::*;

  fn key() -> PendingKey {
    PendingKey::new("LabResults", "labReportId", "25G3917")
  }

  #[tokio::test]
  async fn test_upsert_find_delete() {
    let store = MemoryStore::new();
    assert!(store.find_one(&key()).await.unwrap().is_none());

    let mut event_data = Map::new();
    event_data.insert("email".into(), json!({ "subject": "Report 25G3917" }));
    let record = PendingTrigger::new(&key(), vec!["email".into()], event_data);
    store.upsert(&record).await.unwrap();

    assert_eq!(store.find_one(&key()).await.unwrap(), Some(record));
    assert!(store.delete_one(&key()).await.unwrap());
    assert!(!store.delete_one(&key()).await.unwrap());
    assert!(store.is_empty().await);
  }

  #[tokio::test]
  async fn test_upsert_preserves_created_at() {
    let store = MemoryStore::new();
    let first = PendingTrigger::new(&key(), vec!["email".into()], Map::new());
    store.upsert(&first).await.unwrap();

    let mut second = PendingTrigger::new(&key(), vec!["email".into(), "pdf".into()], Map::new());
    second.created_at = first.created_at + Duration::hours(1);
    store.upsert(&second).await.unwrap();

    let stored = store.find_one(&key()).await.unwrap().unwrap();
    assert_eq!(stored.created_at, first.created_at);
    assert_eq!(stored.triggered_conditions.0, vec!["email", "pdf"]);
    assert_eq!(store.len().await, 1);
  }

  #[tokio::test]
  async fn test_keys_are_isolated() {
    let store = MemoryStore::new();
    let other = PendingKey::new("LabResults", "labReportId", "99X0001");
    store
      .upsert(&PendingTrigger::new(&key(), vec!["email".into()], Map::new()))
      .await
      .unwrap();

    assert!(store.find_one(&other).await.unwrap().is_none());
  }
}
