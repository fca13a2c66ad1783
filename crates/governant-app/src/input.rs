//! Input documents supplied by the caller.

use governant_engine::PolicyError;
use serde_json::{Map, Value};

/// Parse the policy input document. Blank text is the empty object.
pub fn parse_input_document(text: &str) -> Result<Value, PolicyError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    parse_json_document("input document", text)
}

/// Parse any caller-supplied JSON document; `what` names it in the error.
pub fn parse_json_document(what: &str, text: &str) -> Result<Value, PolicyError> {
    serde_json::from_str(text).map_err(|e| PolicyError::InvalidInput {
        reason: format!("{what}: {e}"),
    })
}
