//! Reference deploy policy, in Rust, standing in for a compiled `github.deploy` package.
//!
//! Rules are read from `input.repo_policy.policy.environments.<environment>.rules`; missing
//! keys fall back to [`Rules::default`].

use governant_types::ids::{
    CODE_INSUFFICIENT_APPROVALS, CODE_MISSING_SIGNOFF, CODE_MISSING_TICKET,
    CODE_RATE_LIMIT_EXCEEDED, CODE_TESTS_FAILED,
};
use serde_json::{Value, json};

pub const PACKAGE: &str = "github.deploy";

#[derive(Clone, Debug, PartialEq)]
pub struct Rules {
    pub approvals_required: u64,
    pub tests_passed: bool,
    pub signed_off: bool,
    pub require_ticket: bool,
    pub max_deployments_per_day: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            approvals_required: 2,
            tests_passed: true,
            signed_off: true,
            require_ticket: false,
            max_deployments_per_day: 5,
        }
    }
}

impl Rules {
    pub fn for_input(input: &Value) -> Self {
        let defaults = Self::default();
        let environment = input
            .get("environment")
            .and_then(Value::as_str)
            .unwrap_or("production");
        let rules = input
            .pointer(&format!("/repo_policy/policy/environments/{environment}/rules"))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            approvals_required: rules
                .get("approvals_required")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.approvals_required),
            tests_passed: rules
                .get("tests_passed")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.tests_passed),
            signed_off: rules
                .get("signed_off")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.signed_off),
            require_ticket: rules
                .get("require_ticket")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.require_ticket),
            max_deployments_per_day: rules
                .get("max_deployments_per_day")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.max_deployments_per_day),
        }
    }
}

/// Violations for `input`, in rule order.
pub fn violations(input: &Value) -> Vec<Value> {
    let rules = Rules::for_input(input);
    let meta = input.get("workflow_meta").cloned().unwrap_or(Value::Null);
    let mut out = Vec::new();

    let approvers = meta
        .get("approvers")
        .and_then(Value::as_array)
        .map_or(0, Vec::len) as u64;
    if approvers < rules.approvals_required {
        out.push(violation(
            CODE_INSUFFICIENT_APPROVALS,
            format!("{approvers} of {} required approvals", rules.approvals_required),
        ));
    }

    let tests = meta
        .pointer("/checks/tests")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if rules.tests_passed && !tests {
        out.push(violation(CODE_TESTS_FAILED, "tests must pass".to_string()));
    }

    let signed_off = meta.get("signed_off").and_then(Value::as_bool).unwrap_or(false);
    if rules.signed_off && !signed_off {
        out.push(violation(CODE_MISSING_SIGNOFF, "sign-off is required".to_string()));
    }

    let has_ticket = meta
        .get("ticket_refs")
        .and_then(Value::as_array)
        .is_some_and(|refs| !refs.is_empty());
    if rules.require_ticket && !has_ticket {
        out.push(violation(CODE_MISSING_TICKET, "a ticket reference is required".to_string()));
    }

    let deployments = meta
        .get("deployments_today")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if deployments > rules.max_deployments_per_day {
        out.push(violation(
            CODE_RATE_LIMIT_EXCEEDED,
            format!(
                "{deployments} deployments today exceeds the limit of {}",
                rules.max_deployments_per_day
            ),
        ));
    }

    out
}

pub fn allow(input: &Value) -> bool {
    violations(input).is_empty()
}

/// Answer a fully-qualified entrypoint (`data.github.deploy.allow`), or `None` when the
/// package does not define it.
pub fn evaluate(entrypoint: &str, input: &Value) -> Option<Value> {
    let rule = entrypoint
        .strip_prefix("data.")?
        .strip_prefix(PACKAGE)?
        .strip_prefix('.')?;
    match rule {
        "allow" => Some(Value::Bool(allow(input))),
        "violations" => Some(Value::Array(violations(input))),
        _ => None,
    }
}

fn violation(code: &str, msg: String) -> Value {
    json!({"code": code, "msg": msg})
}
