//! Host configuration.
//!
//! Read from an optional JSON file in the data directory:
//!
//! ```json
//! {
//!   "databaseUrl": "sqlite:///home/me/.autoflow/autoflow.db",
//!   "triggers": { "lab-report-intake": true },
//!   "triggersEnabledByDefault": false,
//!   "pollIntervalMs": 2000
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
  /// Pending-trigger database. Defaults to a sqlite file in the data directory.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub database_url: Option<String>,

  /// Per-workflow trigger switches.
  #[serde(default)]
  pub triggers: BTreeMap<String, bool>,

  #[serde(default)]
  pub triggers_enabled_by_default: bool,

  /// Polling interval for the bundled file watcher.
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
  DEFAULT_POLL_INTERVAL_MS
}

impl Default for HostConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      triggers: BTreeMap::new(),
      triggers_enabled_by_default: false,
      poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
    }
  }
}

impl HostConfig {
  /// Load from `path`, falling back to defaults when the file does not exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })
  }

  /// Whether the event trigger of `workflow_key` should be registered.
  ///
  /// Explicit `triggers` entries win, then the `AUTOFLOW_TRIGGER_<KEY>`
  /// environment variable, then `triggersEnabledByDefault`.
  pub fn trigger_enabled(&self, workflow_key: &str) -> bool {
    self.trigger_enabled_with(workflow_key, |name| std::env::var(name).ok())
  }

  /// [`trigger_enabled`](Self::trigger_enabled) with an injectable environment lookup.
  pub fn trigger_enabled_with(
    &self,
    workflow_key: &str,
    env: impl Fn(&str) -> Option<String>,
  ) -> bool {
    if let Some(enabled) = self.triggers.get(workflow_key) {
      return *enabled;
    }

    match env(&trigger_env_var(workflow_key)) {
      Some(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true"),
      None => self.triggers_enabled_by_default,
    }
  }
}

/// Environment variable consulted for a workflow's trigger switch.
///
/// `lab-report.intake` becomes `AUTOFLOW_TRIGGER_LAB_REPORT_INTAKE`.
pub fn trigger_env_var(workflow_key: &str) -> String {
  let suffix: String = workflow_key
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() {
        c.to_ascii_uppercase()
      } else {
        '_'
      }
    })
    .collect();
  format!("AUTOFLOW_TRIGGER_{}", suffix)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_env_var_name() {
    assert_eq!(
      trigger_env_var("lab-report.intake"),
      "AUTOFLOW_TRIGGER_LAB_REPORT_INTAKE"
    );
  }

  #[test]
  fn test_explicit_switch_wins() {
    let mut config = HostConfig::default();
    config.triggers.insert("w".to_string(), false);

    assert!(!config.trigger_enabled_with("w", |_| Some("true".to_string())));
  }

  #[test]
  fn test_env_then_default() {
    let config = HostConfig {
      triggers_enabled_by_default: true,
      ..HostConfig::default()
    };

    assert!(!config.trigger_enabled_with("w", |_| Some("0".to_string())));
    assert!(config.trigger_enabled_with("w", |_| Some("TRUE".to_string())));
    assert!(config.trigger_enabled_with("w", |_| None));
    assert!(!HostConfig::default().trigger_enabled_with("w", |_| None));
  }

  #[test]
  fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig::load(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, HostConfig::default());
  }

  #[test]
  fn test_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
      &path,
      r#"{ "triggers": { "intake": true }, "pollIntervalMs": 500 }"#,
    )
    .unwrap();

    let config = HostConfig::load(&path).unwrap();
    assert_eq!(config.poll_interval_ms, 500);
    assert!(config.trigger_enabled_with("intake", |_| None));
    assert!(config.database_url.is_none());
  }
}
