//! Combining per-item `forEach` outputs.

use autoflow_config::CombineStrategy;
use serde_json::{Map, Value, json};

/// Combine loop outputs into `{ "results": ... }`.
///
/// - `array`: the outputs in item order, `null` for an item whose steps produced nothing
/// - `merge`: object outputs shallow-merged, later keys win
/// - `flatten`: array outputs flattened one level
/// - `mergeContent`: first `header`, all `content` arrays concatenated
pub fn combine_results(strategy: CombineStrategy, outputs: Vec<Value>) -> Value {
  let results = match strategy {
    CombineStrategy::Array => Value::Array(outputs),
    CombineStrategy::Merge => {
      let mut merged = Map::new();
      for output in outputs {
        if let Value::Object(map) = output {
          merged.extend(map);
        }
      }
      Value::Object(merged)
    }
    CombineStrategy::Flatten => Value::Array(
      outputs
        .into_iter()
        .flat_map(|output| match output {
          Value::Array(items) => items,
          other => vec![other],
        })
        .collect(),
    ),
    CombineStrategy::MergeContent => {
      let header = outputs
        .first()
        .and_then(|first| first.get("header"))
        .cloned()
        .unwrap_or(Value::Null);
      let mut content = Vec::new();
      for mut output in outputs {
        match output.get_mut("content").map(Value::take) {
          Some(Value::Array(items)) => content.extend(items),
          Some(Value::Null) | None => {}
          Some(other) => content.push(other),
        }
      }
      json!({ "header": header, "content": content })
    }
  };

  json!({ "results": results })
}
