//! Event trigger definitions.
//!
//! A workflow may carry an `eventTrigger` binding a background event stream
//! to automatic invocation. A trigger has either a single `condition` or a
//! `compositeCondition` whose sub-conditions correlate on a shared key.
//!
//! ```json
//! {
//!   "event": { "type": "watchEmail", "emailAccount": "GMAIL_1" },
//!   "compositeCondition": {
//!     "type": "all",
//!     "matchKey": "labReportId",
//!     "conditions": [
//!       {
//!         "id": "workOrder",
//!         "condition": { "from": "email.subject", "contains": "Work Order" },
//!         "extract": { "from": "email.subject", "pattern": "#(\\w+)" }
//!       }
//!     ]
//!   },
//!   "inputMapping": { "orderEmail": "workOrder.email" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTriggerDef {
  pub event: EventSource,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<EventCondition>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub composite_condition: Option<CompositeConditionDef>,

  /// Workflow input name to the event value it is read from.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub input_mapping: BTreeMap<String, ValueSelector>,
}

/// The background event stream a trigger listens on, plus producer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
  #[serde(rename = "type")]
  pub kind: String,

  #[serde(flatten)]
  pub params: Map<String, Value>,
}

impl EventSource {
  pub const WATCH_EMAIL: &'static str = "watchEmail";
  pub const WATCH_FILES: &'static str = "watchFiles";

  /// Event bus name this source publishes on.
  pub fn event_name(&self) -> &str {
    match self.kind.as_str() {
      Self::WATCH_EMAIL => "newEmail",
      Self::WATCH_FILES => "fileChange",
      other => other,
    }
  }

  /// String parameter lookup.
  pub fn param(&self, key: &str) -> Option<&str> {
    self.params.get(key).and_then(Value::as_str)
  }
}

/// Reads a value out of an event: a plain path, or a path with an array filter
/// and a property projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSelector {
  Path(String),
  Extract(ExtractDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractDef {
  /// Dotted path, `name[0]` index syntax allowed.
  pub from: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<ArrayFilter>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub property: Option<String>,
}

/// Picks the first array element matching every present criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayFilter {
  /// Case-insensitive suffix of the element's `filename`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extension: Option<String>,
}

/// Predicate over an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventCondition {
  All { all: Vec<EventCondition> },
  Any { any: Vec<EventCondition> },
  Not { not: Box<EventCondition> },
  Field(FieldTest),
  Constant(bool),
  /// `{{path}}` truthiness or an interpolated string, as for step conditions.
  Template(String),
}

/// Tests on a single extracted value. Every present test must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTest {
  #[serde(flatten)]
  pub source: ExtractDef,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub equals: Option<Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contains: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ends_with: Option<String>,

  /// Regular expression the stringified value must match.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub matches: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exists: Option<bool>,

  #[serde(default)]
  pub ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeKind {
  All,
  Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeConditionDef {
  #[serde(rename = "type")]
  pub kind: CompositeKind,
  pub match_key: String,
  pub conditions: Vec<NamedCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCondition {
  pub id: String,
  pub condition: EventCondition,
  pub extract: KeyExtractionDef,
}

/// How the correlation value is read from a matched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyExtractionDef {
  #[serde(flatten)]
  pub source: ExtractDef,

  /// Regex with one capture group. Without it the whole value is the key.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_event_names() {
    let email: EventSource =
      serde_json::from_value(json!({ "type": "watchEmail", "emailAccount": "GMAIL_1" })).unwrap();
    let files: EventSource =
      serde_json::from_value(json!({ "type": "watchFiles", "folder": "/tmp/in" })).unwrap();
    let custom: EventSource = serde_json::from_value(json!({ "type": "calendarReminder" })).unwrap();

    assert_eq!(email.event_name(), "newEmail");
    assert_eq!(email.param("emailAccount"), Some("GMAIL_1"));
    assert_eq!(files.event_name(), "fileChange");
    assert_eq!(custom.event_name(), "calendarReminder");
  }

  #[test]
  fn test_value_selector_forms() {
    let mapping: BTreeMap<String, ValueSelector> = serde_json::from_value(json!({
      "subject": "email.subject",
      "report": { "from": "email.attachments", "filter": { "extension": ".pdf" }, "property": "path" }
    }))
    .unwrap();

    assert_eq!(mapping["subject"], ValueSelector::Path("email.subject".to_string()));
    match &mapping["report"] {
      ValueSelector::Extract(def) => {
        assert_eq!(def.from, "email.attachments");
        assert_eq!(def.property.as_deref(), Some("path"));
        assert_eq!(
          def.filter.as_ref().and_then(|f| f.extension.as_deref()),
          Some(".pdf")
        );
      }
      other => panic!("expected extract selector, got {:?}", other),
    }
  }

  #[test]
  fn test_event_condition_forms() {
    let condition: EventCondition = serde_json::from_value(json!({
      "all": [
        { "from": "email.subject", "contains": "work order", "ignoreCase": true },
        { "not": { "from": "email.sender", "equals": "noreply@lab.com" } },
        "{{email.attachments}}",
        true
      ]
    }))
    .unwrap();

    let EventCondition::All { all } = condition else {
      panic!("expected all");
    };
    assert_eq!(all.len(), 4);
    match &all[0] {
      EventCondition::Field(test) => {
        assert_eq!(test.source.from, "email.subject");
        assert_eq!(test.contains.as_deref(), Some("work order"));
        assert!(test.ignore_case);
      }
      other => panic!("expected field test, got {:?}", other),
    }
    assert!(matches!(all[1], EventCondition::Not { .. }));
    assert_eq!(all[2], EventCondition::Template("{{email.attachments}}".to_string()));
    assert_eq!(all[3], EventCondition::Constant(true));
  }

  #[test]
  fn test_composite_condition() {
    let trigger: EventTriggerDef = serde_json::from_value(json!({
      "event": { "type": "watchEmail", "emailAccount": "LAB" },
      "compositeCondition": {
        "type": "all",
        "matchKey": "labReportId",
        "conditions": [
          {
            "id": "labReportUpload",
            "condition": { "from": "email.attachments", "filter": { "extension": ".pdf" }, "exists": true },
            "extract": {
              "from": "email.attachments",
              "filter": { "extension": ".pdf" },
              "property": "filename",
              "pattern": "^(\\w+)\\.pdf$"
            }
          }
        ]
      }
    }))
    .unwrap();

    let composite = trigger.composite_condition.unwrap();
    assert_eq!(composite.kind, CompositeKind::All);
    assert_eq!(composite.match_key, "labReportId");
    let named = &composite.conditions[0];
    assert_eq!(named.extract.source.property.as_deref(), Some("filename"));
    assert_eq!(named.extract.pattern.as_deref(), Some("^(\\w+)\\.pdf$"));
  }
}
