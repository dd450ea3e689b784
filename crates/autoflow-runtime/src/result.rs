//! Execution result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Context;

/// Result of a complete workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
  /// Unique execution ID.
  pub execution_id: String,
  pub workflow_key: String,
  /// Projection of the declared output keys, or the last step's output.
  pub output: Value,
  /// Context as it stood after the last step.
  pub context: Context,
}
