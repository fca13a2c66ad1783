use governant_types::Decision;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderableVerdict {
    Allow,
    Deny,
}

impl RenderableVerdict {
    pub fn from_allow(allow: bool) -> Self {
        if allow { Self::Allow } else { Self::Deny }
    }

    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

/// One violation, with its human-facing parts pulled out of the opaque value.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderableViolation {
    pub code: Option<String>,
    pub message: String,
    pub raw: Value,
}

impl RenderableViolation {
    /// `code` from the `code` key; message from `msg`, then `message`, else the value as
    /// compact JSON (strings are used verbatim).
    pub fn from_value(raw: &Value) -> Self {
        let code = raw.get("code").and_then(Value::as_str).map(str::to_string);
        let message = raw
            .get("msg")
            .or_else(|| raw.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        Self {
            code,
            message,
            raw: raw.clone(),
        }
    }
}

/// What a query produced, in the shape each subcommand reports.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderableReport {
    Allow {
        verdict: RenderableVerdict,
    },
    Violations {
        violations: Vec<RenderableViolation>,
    },
    Decision {
        verdict: RenderableVerdict,
        violations: Vec<RenderableViolation>,
    },
    Raw {
        value: Value,
    },
}

impl RenderableReport {
    pub fn allow(allow: bool) -> Self {
        Self::Allow {
            verdict: RenderableVerdict::from_allow(allow),
        }
    }

    pub fn violations(violations: &[Value]) -> Self {
        Self::Violations {
            violations: violations.iter().map(RenderableViolation::from_value).collect(),
        }
    }

    pub fn decision(decision: &Decision) -> Self {
        Self::Decision {
            verdict: RenderableVerdict::from_allow(decision.allow),
            violations: decision
                .violations
                .iter()
                .map(RenderableViolation::from_value)
                .collect(),
        }
    }

    pub fn raw(value: Value) -> Self {
        Self::Raw { value }
    }
}
