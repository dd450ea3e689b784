use thiserror::Error;

/// Errors raised while reading configuration or definition files.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}
