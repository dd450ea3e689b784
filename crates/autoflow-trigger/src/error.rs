use autoflow_store::StoreError;
use thiserror::Error;

/// Failures while evaluating or acting on an event trigger.
///
/// Matchers catch these and log them; they never reach the event bus.
#[derive(Debug, Error)]
pub enum TriggerError {
  #[error("invalid pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("pending trigger store: {0}")]
  Store(#[from] StoreError),

  #[error("producer '{identity}': {message}")]
  Producer { identity: String, message: String },
}

impl TriggerError {
  pub fn producer(identity: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Producer {
      identity: identity.into(),
      message: message.into(),
    }
  }
}
