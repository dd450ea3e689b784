use thiserror::Error;

/// Errors raised by task handlers. The message is surfaced to callers as-is.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("{0}")]
  Failed(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl TaskError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("task already registered: {name}")]
  AlreadyRegistered { name: String },
}
