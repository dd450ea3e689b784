//! Step condition evaluation.
//!
//! Conditions are not an expression language. A condition is a boolean
//! literal, a single `{{path}}` checked for presence, or a string that is
//! interpolated and then compared against a few falsy spellings.

use serde_json::Value;

use crate::Context;
use crate::template::{get_nested_value, interpolate, whole_placeholder};

const FALSY_STRINGS: &[&str] = &["", "false", "null", "undefined"];

/// Decide whether `condition` holds against `context`.
///
/// A single placeholder is true unless the value is missing, null or `false`;
/// `0` and `""` count as true.
pub fn evaluate_condition(condition: &Value, context: &Context) -> bool {
  match condition {
    Value::Bool(b) => *b,
    Value::String(s) if s.is_empty() => false,
    Value::String(s) => {
      if let Some(path) = whole_placeholder(s) {
        return match get_nested_value(context, path) {
          None | Some(Value::Null) | Some(Value::Bool(false)) => false,
          Some(_) => true,
        };
      }
      let rendered = interpolate(s, context);
      !FALSY_STRINGS.iter().any(|falsy| *falsy == rendered)
    }
    Value::Null => false,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::Array(_) | Value::Object(_) => true,
  }
}
