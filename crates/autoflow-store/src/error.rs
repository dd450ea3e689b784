use thiserror::Error;

/// Errors from pending trigger storage.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}
