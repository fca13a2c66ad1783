use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical outcome of a policy evaluation.
///
/// `allow` is only ever true when the violation list is empty; build values with
/// [`Decision::conjunctive`] rather than the struct literal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    pub allow: bool,
    #[serde(default)]
    pub violations: Vec<Value>,
}

impl Decision {
    /// Combine an allow signal with a violation list.
    ///
    /// A stale `allow = true` next to a non-empty violation list is a deny.
    pub fn conjunctive(allow: bool, violations: Vec<Value>) -> Self {
        Self {
            allow: allow && violations.is_empty(),
            violations,
        }
    }

    pub fn is_denied(&self) -> bool {
        !self.allow
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_requires_empty_violations() {
        let d = Decision::conjunctive(true, vec![json!({"code": "tests_failed"})]);
        assert!(!d.allow);
        assert!(d.has_violations());

        let d = Decision::conjunctive(true, Vec::new());
        assert!(d.allow);

        let d = Decision::conjunctive(false, Vec::new());
        assert!(d.is_denied());
        assert!(!d.has_violations());
    }

    #[test]
    fn serializes_to_decision_document() {
        let d = Decision::conjunctive(false, vec![json!("x")]);
        let v = serde_json::to_value(&d).expect("serialize");
        assert_eq!(v, json!({"allow": false, "violations": ["x"]}));
    }
}
