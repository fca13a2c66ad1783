use crate::json::render_json_pretty;
use crate::{RenderableReport, RenderableViolation};

/// Plain text: `ALLOW`/`DENY`, then the violation list (`- [code] message`) or
/// `No violations.`. Raw values print as pretty JSON.
pub fn render_text(report: &RenderableReport) -> String {
    let mut out = String::new();
    match report {
        RenderableReport::Allow { verdict } => {
            out.push_str(verdict.label());
            out.push('\n');
        }
        RenderableReport::Violations { violations } => push_violations(&mut out, violations),
        RenderableReport::Decision {
            verdict,
            violations,
        } => {
            out.push_str(verdict.label());
            out.push('\n');
            push_violations(&mut out, violations);
        }
        RenderableReport::Raw { .. } => {
            out.push_str(&render_json_pretty(report));
            out.push('\n');
        }
    }
    out
}

fn push_violations(out: &mut String, violations: &[RenderableViolation]) {
    if violations.is_empty() {
        out.push_str("No violations.\n");
        return;
    }
    out.push_str("Violations:\n");
    for v in violations {
        match &v.code {
            Some(code) => out.push_str(&format!("- [{code}] {}\n", v.message)),
            None => out.push_str(&format!("- {}\n", v.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governant_types::Decision;
    use serde_json::json;

    #[test]
    fn allowed_decision() {
        let decision = Decision::conjunctive(true, Vec::new());
        insta::assert_snapshot!(render_text(&RenderableReport::decision(&decision)), @r"
        ALLOW
        No violations.
        ");
    }

    #[test]
    fn denied_decision_lists_violations() {
        let decision = Decision::conjunctive(
            true,
            vec![
                json!({"code": "tests_failed", "msg": "tests must pass"}),
                json!({"code": "rate_limit_exceeded", "msg": "8 deployments today (max 5)"}),
                json!("free-form reason"),
            ],
        );
        insta::assert_snapshot!(render_text(&RenderableReport::decision(&decision)), @r"
        DENY
        Violations:
        - [tests_failed] tests must pass
        - [rate_limit_exceeded] 8 deployments today (max 5)
        - free-form reason
        ");
    }

    #[test]
    fn allow_only_and_raw() {
        assert_eq!(render_text(&RenderableReport::allow(false)), "DENY\n");
        assert_eq!(render_text(&RenderableReport::violations(&[])), "No violations.\n");
        assert_eq!(render_text(&RenderableReport::raw(json!(true))), "true\n");
    }
}
