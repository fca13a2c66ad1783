use serde_json::{Value, json};

use crate::{RenderableReport, RenderableViolation};

/// The machine-readable document for a report: `{"allow"}`, `{"violations"}`,
/// `{"allow", "violations"}`, or the raw value.
pub fn to_json(report: &RenderableReport) -> Value {
    match report {
        RenderableReport::Allow { verdict } => json!({"allow": verdict.is_allow()}),
        RenderableReport::Violations { violations } => json!({"violations": raw(violations)}),
        RenderableReport::Decision {
            verdict,
            violations,
        } => json!({"allow": verdict.is_allow(), "violations": raw(violations)}),
        RenderableReport::Raw { value } => value.clone(),
    }
}

/// Compact JSON, one line.
pub fn render_json(report: &RenderableReport) -> String {
    to_json(report).to_string()
}

pub fn render_json_pretty(report: &RenderableReport) -> String {
    let value = to_json(report);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn raw(violations: &[RenderableViolation]) -> Vec<Value> {
    violations.iter().map(|v| v.raw.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use governant_types::Decision;

    #[test]
    fn shapes_per_query() {
        assert_eq!(render_json(&RenderableReport::allow(true)), r#"{"allow":true}"#);
        assert_eq!(
            render_json(&RenderableReport::violations(&[json!({"code": "x"})])),
            r#"{"violations":[{"code":"x"}]}"#
        );
        let decision = Decision::conjunctive(true, Vec::new());
        assert_eq!(
            render_json(&RenderableReport::decision(&decision)),
            r#"{"allow":true,"violations":[]}"#
        );
        assert_eq!(render_json(&RenderableReport::raw(Value::Null)), "null");
    }

    #[test]
    fn pretty_decision() {
        let decision = Decision::conjunctive(
            true,
            vec![json!({"code": "tests_failed", "msg": "tests must pass"})],
        );
        insta::assert_snapshot!(render_json_pretty(&RenderableReport::decision(&decision)), @r#"
        {
          "allow": false,
          "violations": [
            {
              "code": "tests_failed",
              "msg": "tests must pass"
            }
          ]
        }
        "#);
    }
}
