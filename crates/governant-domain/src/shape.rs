//! Closed set of raw result shapes produced by the supported backends.

use serde_json::{Map, Value};

/// Keys an element of an engine result set may carry.
const RESULT_SET_KEYS: [&str; 3] = ["result", "expressions", "bindings"];

/// Shape of a raw backend result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResultShape<'a> {
    /// `true` / `false`.
    Bool(bool),
    /// Engine result set: `[{"result": v}]` or `[{"expressions": [{"value": v}]}]`.
    ResultSet(&'a [Value]),
    /// Mapping carrying a `result` key; the payload is the value under it.
    Envelope(&'a Value),
    /// Any other list, including the empty list.
    List(&'a [Value]),
    Null,
    /// Unrecognized: scalars and mappings without a `result` key.
    Other(&'a Value),
}

pub fn classify(raw: &Value) -> ResultShape<'_> {
    match raw {
        Value::Bool(b) => ResultShape::Bool(*b),
        Value::Null => ResultShape::Null,
        Value::Array(items) if is_result_set(items) => ResultShape::ResultSet(items),
        Value::Array(items) => ResultShape::List(items),
        Value::Object(map) => match map.get("result") {
            Some(inner) => ResultShape::Envelope(inner),
            None => ResultShape::Other(raw),
        },
        _ => ResultShape::Other(raw),
    }
}

fn is_result_set(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| match item {
            Value::Object(map) => is_result_set_element(map),
            _ => false,
        })
}

fn is_result_set_element(map: &Map<String, Value>) -> bool {
    map.keys().all(|k| RESULT_SET_KEYS.contains(&k.as_str()))
        && (map.contains_key("result") || map.contains_key("expressions"))
}

/// Payload of the first element of a result set: its `result`, else its first expression's
/// `value`.
pub(crate) fn first_payload(items: &[Value]) -> Option<&Value> {
    let first = items.first()?.as_object()?;
    if let Some(result) = first.get("result") {
        return Some(result);
    }
    first
        .get("expressions")?
        .as_array()?
        .first()?
        .as_object()?
        .get("value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_known_shapes() {
        assert_eq!(classify(&json!(true)), ResultShape::Bool(true));
        assert_eq!(classify(&Value::Null), ResultShape::Null);

        let set = json!([{"result": [1, 2]}]);
        assert!(matches!(classify(&set), ResultShape::ResultSet(_)));

        let exprs = json!([{"expressions": [{"value": true, "text": "x"}]}]);
        assert!(matches!(classify(&exprs), ResultShape::ResultSet(_)));

        let env = json!({"result": false});
        assert_eq!(classify(&env), ResultShape::Envelope(&json!(false)));
    }

    #[test]
    fn violation_lists_are_not_result_sets() {
        let violations = json!([{"code": "tests_failed", "message": "tests must pass"}]);
        assert!(matches!(classify(&violations), ResultShape::List(_)));

        // one foreign key disqualifies the whole list
        let mixed = json!([{"result": 1}, {"result": 2, "code": "x"}]);
        assert!(matches!(classify(&mixed), ResultShape::List(_)));

        assert!(matches!(classify(&json!([])), ResultShape::List(_)));
    }

    #[test]
    fn scalars_and_plain_objects_are_other() {
        assert!(matches!(classify(&json!(3)), ResultShape::Other(_)));
        assert!(matches!(classify(&json!("x")), ResultShape::Other(_)));
        assert!(matches!(classify(&json!({"a": 1})), ResultShape::Other(_)));
    }

    #[test]
    fn first_payload_prefers_result() {
        let items = json!([{"result": 1, "expressions": [{"value": 2}]}]);
        let items = items.as_array().expect("array");
        assert_eq!(first_payload(items), Some(&json!(1)));

        let items = json!([{"expressions": [{"value": 2}]}]);
        let items = items.as_array().expect("array");
        assert_eq!(first_payload(items), Some(&json!(2)));

        let items = json!([{"expressions": []}]);
        let items = items.as_array().expect("array");
        assert_eq!(first_payload(items), None);
    }
}
