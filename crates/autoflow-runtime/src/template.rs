//! Placeholder substitution.
//!
//! A string that is exactly one placeholder (`"{{H.metadata}}"`) resolves to
//! the raw value at that path, which may be an object, array, number, bool or
//! null. A string with placeholders mixed into other text is interpolated:
//! scalars are written as-is, objects and arrays as pretty-printed JSON.
//!
//! A path that does not resolve leaves the placeholder text untouched, so a
//! missing optional input stays visibly distinct from an empty string.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::Context;

static WHOLE_PLACEHOLDER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\{\{([\w.]+)\}\}$").expect("valid placeholder pattern"));

static PLACEHOLDER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\{\{([\w.]+)\}\}").expect("valid placeholder pattern"));

/// Resolve every placeholder in `value` against `context`.
pub fn resolve_value(value: &Value, context: &Context) -> Value {
  match value {
    Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, context)).collect()),
    Value::Object(map) => Value::Object(
      map
        .iter()
        .map(|(k, v)| (k.clone(), resolve_value(v, context)))
        .collect(),
    ),
    Value::String(s) => {
      if let Some(path) = whole_placeholder(s) {
        return match get_nested_value(context, path) {
          Some(resolved) => resolved.clone(),
          None => value.clone(),
        };
      }
      match interpolate(s, context) {
        Cow::Borrowed(_) => value.clone(),
        Cow::Owned(s) => Value::String(s),
      }
    }
    other => other.clone(),
  }
}

/// The path of a string that consists of exactly one placeholder.
pub fn whole_placeholder(s: &str) -> Option<&str> {
  WHOLE_PLACEHOLDER
    .captures(s)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str())
}

/// Substitute each placeholder inside `s`, leaving unresolved ones in place.
pub fn interpolate<'a>(s: &'a str, context: &Context) -> Cow<'a, str> {
  PLACEHOLDER.replace_all(s, |caps: &Captures| match get_nested_value(context, &caps[1]) {
    Some(resolved) => stringify(resolved),
    None => caps[0].to_string(),
  })
}

/// Text form of a value inside an interpolated string.
pub fn stringify(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Array(_) | Value::Object(_) => {
      serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    }
    other => other.to_string(),
  }
}

/// Walk a dotted path from the context root. `None` means undefined.
pub fn get_nested_value<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
  let mut segments = path.split('.');
  let first = segments.next()?;
  let mut current = context.get(first)?;
  for segment in segments {
    current = step_into(current, segment)?;
  }
  Some(current)
}

/// Walk a dotted path from an arbitrary value.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
  path
    .split('.')
    .try_fold(root, |current, segment| step_into(current, segment))
}

fn step_into<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
  match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  }
}
