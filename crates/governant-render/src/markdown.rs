use crate::json::render_json_pretty;
use crate::{RenderableReport, RenderableVerdict, RenderableViolation};

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();
    out.push_str("# Policy decision\n\n");

    match report {
        RenderableReport::Allow { verdict } => push_verdict(&mut out, *verdict),
        RenderableReport::Violations { violations } => push_violations(&mut out, violations),
        RenderableReport::Decision {
            verdict,
            violations,
        } => {
            push_verdict(&mut out, *verdict);
            push_violations(&mut out, violations);
        }
        RenderableReport::Raw { .. } => {
            out.push_str("```json\n");
            out.push_str(&render_json_pretty(report));
            out.push_str("\n```\n");
        }
    }
    out
}

fn push_verdict(out: &mut String, verdict: RenderableVerdict) {
    out.push_str(&format!("- Verdict: **{}**\n\n", verdict.label()));
}

fn push_violations(out: &mut String, violations: &[RenderableViolation]) {
    if violations.is_empty() {
        out.push_str("No violations.\n");
        return;
    }
    out.push_str(&format!("## Violations ({})\n\n", violations.len()));
    for v in violations {
        let message = escape(&v.message);
        match &v.code {
            Some(code) => out.push_str(&format!("- `{code}` {message}\n")),
            None => out.push_str(&format!("- {message}\n")),
        }
    }
}

/// Keep one violation per list item.
fn escape(s: &str) -> String {
    s.replace('\r', "").replace('\n', " ")
}
