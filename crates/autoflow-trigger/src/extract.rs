//! Reading values out of event payloads.
//!
//! Paths are dotted (`email.subject`) and may index arrays with brackets
//! (`email.attachments[0].filename`, read as `email.attachments.0.filename`).

use std::collections::BTreeMap;

use autoflow_config::{ExtractDef, ValueSelector};
use autoflow_runtime::{Context, lookup};
use serde_json::Value;

/// Rewrite `a[0].b` as `a.0.b`.
pub fn normalize_path(path: &str) -> String {
  path.replace('[', ".").replace(']', "")
}

/// Read a plain path from `event`.
pub fn read_path<'a>(event: &'a Value, path: &str) -> Option<&'a Value> {
  lookup(event, &normalize_path(path))
}

/// Apply an extraction rule: path, then optional array filter, then optional
/// property projection.
pub fn extract<'a>(event: &'a Value, def: &ExtractDef) -> Option<&'a Value> {
  let mut value = read_path(event, &def.from)?;

  if let Some(extension) = def.filter.as_ref().and_then(|f| f.extension.as_deref()) {
    let extension = extension.to_lowercase();
    value = value.as_array()?.iter().find(|item| {
      item
        .get("filename")
        .and_then(Value::as_str)
        .is_some_and(|name| name.to_lowercase().ends_with(&extension))
    })?;
  }

  match &def.property {
    Some(property) => read_path(value, property),
    None => Some(value),
  }
}

/// Read the value a selector points at.
pub fn select<'a>(event: &'a Value, selector: &ValueSelector) -> Option<&'a Value> {
  match selector {
    ValueSelector::Path(path) => read_path(event, path),
    ValueSelector::Extract(def) => extract(event, def),
  }
}

/// Build workflow inputs from an event. Selectors that find nothing are left out.
pub fn map_inputs(mapping: &BTreeMap<String, ValueSelector>, event: &Value) -> Context {
  mapping
    .iter()
    .filter_map(|(name, selector)| select(event, selector).map(|value| (name.clone(), value.clone())))
    .collect()
}
