use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use sqlx::types::Json;

/// Identity of a pending trigger record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingKey {
  pub workflow_key: String,
  pub match_key: String,
  pub match_key_value: String,
}

impl PendingKey {
  pub fn new(
    workflow_key: impl Into<String>,
    match_key: impl Into<String>,
    match_key_value: impl Into<String>,
  ) -> Self {
    Self {
      workflow_key: workflow_key.into(),
      match_key: match_key.into(),
      match_key_value: match_key_value.into(),
    }
  }
}

/// A composite trigger that has seen some, but not enough, of its conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PendingTrigger {
  pub workflow_key: String,
  pub match_key: String,
  pub match_key_value: String,
  /// Ids of the conditions satisfied so far, in the order they were first seen.
  pub triggered_conditions: Json<Vec<String>>,
  /// Event payloads keyed by the id of the condition they satisfied.
  pub event_data: Json<Map<String, Value>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl PendingTrigger {
  /// A fresh record for `key`, stamped with the current time.
  pub fn new(key: &PendingKey, triggered_conditions: Vec<String>, event_data: Map<String, Value>) -> Self {
    let now = Utc::now();
    Self {
      workflow_key: key.workflow_key.clone(),
      match_key: key.match_key.clone(),
      match_key_value: key.match_key_value.clone(),
      triggered_conditions: Json(triggered_conditions),
      event_data: Json(event_data),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn key(&self) -> PendingKey {
    PendingKey::new(&self.workflow_key, &self.match_key, &self.match_key_value)
  }
}
