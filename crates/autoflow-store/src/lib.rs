//! Autoflow Store
//!
//! Persistence for partially satisfied composite triggers. A composite
//! trigger correlates several events by a shared key value (for example a
//! lab report id found in both an email subject and a file name). Until every
//! condition has been seen, the set of satisfied condition ids and the data of
//! each matching event is kept as a [`PendingTrigger`].
//!
//! Records are addressed by [`PendingKey`], the
//! `(workflow key, match key, match key value)` triple, and there is at most
//! one record per triple.

mod error;
mod memory;
mod sqlite;
mod types;

use async_trait::async_trait;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{PendingKey, PendingTrigger};

/// Storage for pending composite trigger state.
#[async_trait]
pub trait PendingTriggerStore: Send + Sync {
  /// Look up the record for `key`.
  async fn find_one(&self, key: &PendingKey) -> Result<Option<PendingTrigger>, StoreError>;

  /// Insert the record, or replace the one with the same key.
  ///
  /// `created_at` of an existing record is preserved.
  async fn upsert(&self, record: &PendingTrigger) -> Result<(), StoreError>;

  /// Remove the record for `key`. Returns whether a record existed.
  async fn delete_one(&self, key: &PendingKey) -> Result<bool, StoreError>;
}
