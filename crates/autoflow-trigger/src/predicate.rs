//! Event predicates.

use autoflow_config::{EventCondition, FieldTest};
use autoflow_runtime::Context;
use autoflow_runtime::condition::evaluate_condition;
use autoflow_runtime::template::stringify;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::TriggerError;
use crate::extract::extract;

/// Decide whether `condition` holds for `event`.
///
/// Only an invalid `matches` pattern is an error; missing fields just fail
/// the test.
pub fn evaluate(condition: &EventCondition, event: &Value) -> Result<bool, TriggerError> {
  match condition {
    EventCondition::All { all } => {
      for condition in all {
        if !evaluate(condition, event)? {
          return Ok(false);
        }
      }
      Ok(true)
    }
    EventCondition::Any { any } => {
      for condition in any {
        if evaluate(condition, event)? {
          return Ok(true);
        }
      }
      Ok(false)
    }
    EventCondition::Not { not } => Ok(!evaluate(not, event)?),
    EventCondition::Constant(value) => Ok(*value),
    EventCondition::Template(template) => {
      let context = match event {
        Value::Object(map) => map.clone(),
        _ => Context::new(),
      };
      Ok(evaluate_condition(&Value::String(template.clone()), &context))
    }
    EventCondition::Field(test) => evaluate_field(test, event),
  }
}

fn evaluate_field(test: &FieldTest, event: &Value) -> Result<bool, TriggerError> {
  let value = extract(event, &test.source).filter(|v| !v.is_null());

  if let Some(expected) = test.exists
    && value.is_some() != expected
  {
    return Ok(false);
  }

  let has_value_test =
    test.equals.is_some() || test.contains.is_some() || test.ends_with.is_some() || test.matches.is_some();

  let Some(value) = value else {
    // `exists: false` alone is satisfied by absence.
    return Ok(test.exists == Some(false) && !has_value_test);
  };

  if !has_value_test {
    return Ok(test.exists.is_some() || !matches!(value, Value::Bool(false)));
  }

  let fold = |s: &str| {
    if test.ignore_case {
      s.to_lowercase()
    } else {
      s.to_string()
    }
  };
  let text = fold(&stringify(value));

  if let Some(expected) = &test.equals {
    let equal = match (expected, value) {
      (Value::String(expected), Value::String(_)) => fold(expected) == text,
      (expected, value) => expected == value,
    };
    if !equal {
      return Ok(false);
    }
  }

  if let Some(needle) = &test.contains
    && !text.contains(&fold(needle))
  {
    return Ok(false);
  }

  if let Some(suffix) = &test.ends_with
    && !text.ends_with(&fold(suffix))
  {
    return Ok(false);
  }

  if let Some(pattern) = &test.matches
    && !compile(pattern, test.ignore_case)?.is_match(&stringify(value))
  {
    return Ok(false);
  }

  Ok(true)
}

pub(crate) fn compile(pattern: &str, ignore_case: bool) -> Result<Regex, TriggerError> {
  RegexBuilder::new(pattern)
    .case_insensitive(ignore_case)
    .build()
    .map_err(|source| TriggerError::InvalidPattern {
      pattern: pattern.to_string(),
      source,
    })
}
