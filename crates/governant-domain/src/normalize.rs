use governant_types::Decision;
use serde_json::Value;

use crate::shape::{ResultShape, classify, first_payload};

/// Coerce a raw result to the canonical boolean.
///
/// Never fails: anything unrecognized falls back to truthiness.
pub fn to_boolean(raw: &Value) -> bool {
    match classify(raw) {
        ResultShape::Bool(b) => b,
        ResultShape::Null => false,
        // A mapping with a `result` key is a backend envelope, not a policy value: it is
        // unwrapped instead of counting as a non-empty (truthy) object.
        ResultShape::Envelope(inner) => to_boolean(inner),
        ResultShape::ResultSet(items) | ResultShape::List(items) => {
            first_bool(items).unwrap_or_else(|| truthy(raw))
        }
        ResultShape::Other(v) => truthy(v),
    }
}

/// Coerce a raw result to an ordered list. Element order is preserved.
pub fn to_list(raw: &Value) -> Vec<Value> {
    match classify(raw) {
        ResultShape::List(items) => items.to_vec(),
        ResultShape::ResultSet(items) => first_payload(items).map(to_list).unwrap_or_default(),
        ResultShape::Envelope(inner) => to_list(inner),
        ResultShape::Null => Vec::new(),
        ResultShape::Bool(_) | ResultShape::Other(_) => vec![raw.clone()],
    }
}

/// Compose a decision from the raw `allow` and `violations` results.
pub fn decide(allow_raw: &Value, violations_raw: &Value) -> Decision {
    Decision::conjunctive(to_boolean(allow_raw), to_list(violations_raw))
}

/// Strip the query envelope printed by `opa eval --format json`.
///
/// - `{"result":[{"expressions":[{"value": V}]}]}` yields `V`
/// - `{"result": V}` with a non-list `V` yields `V`
/// - `{}` (undefined) yields `null`
/// - anything else is returned unchanged
pub fn unwrap_eval_output(parsed: Value) -> Value {
    let Value::Object(mut map) = parsed else {
        return parsed;
    };
    match map.remove("result") {
        None if map.is_empty() => Value::Null,
        None => Value::Object(map),
        Some(Value::Array(rows)) => {
            if rows.is_empty() {
                return Value::Null;
            }
            if let Some(v) = first_expression_value(&rows) {
                return v.clone();
            }
            map.insert("result".to_string(), Value::Array(rows));
            Value::Object(map)
        }
        Some(other) => other,
    }
}

/// JavaScript-style truthiness over JSON.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_bool(items: &[Value]) -> Option<bool> {
    let first = items.first()?.as_object()?;
    if let Some(Value::Bool(b)) = first.get("result") {
        return Some(*b);
    }
    first_expression_value(items)?.as_bool()
}

fn first_expression_value(rows: &[Value]) -> Option<&Value> {
    rows.first()?
        .get("expressions")?
        .as_array()?
        .first()?
        .get("value")
}
