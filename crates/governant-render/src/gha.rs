use crate::{RenderableReport, RenderableVerdict, RenderableViolation};

/// Render a report as GitHub Actions workflow command annotations.
///
/// Format:
/// `::error title={code}::{message}` per violation; a bare denial is a single
/// `::error::policy denied`, an allow is `::notice::policy allowed`.
pub fn render_github_annotations(report: &RenderableReport) -> Vec<String> {
    match report {
        RenderableReport::Allow { verdict } => vec![verdict_line(*verdict)],
        RenderableReport::Violations { violations } => {
            violations.iter().map(violation_line).collect()
        }
        RenderableReport::Decision {
            verdict,
            violations,
        } => {
            if violations.is_empty() {
                vec![verdict_line(*verdict)]
            } else {
                violations.iter().map(violation_line).collect()
            }
        }
        RenderableReport::Raw { value } => {
            vec![format!("::notice::{}", escape_data(&value.to_string()))]
        }
    }
}

fn verdict_line(verdict: RenderableVerdict) -> String {
    match verdict {
        RenderableVerdict::Allow => "::notice::policy allowed".to_string(),
        RenderableVerdict::Deny => "::error::policy denied".to_string(),
    }
}

fn violation_line(v: &RenderableViolation) -> String {
    let message = escape_data(&v.message);
    match &v.code {
        Some(code) => format!("::error title={}::{}", escape_property(code), message),
        None => format!("::error::{message}"),
    }
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
