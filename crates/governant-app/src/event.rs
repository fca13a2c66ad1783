//! GitHub event payloads to policy input documents.

use governant_domain::truthy;
use governant_settings::Overrides;
use regex::Regex;
use serde_json::{Value, json};

use crate::query::{Query, QueryInput, QueryOutput, run_query};

pub const DEFAULT_ENVIRONMENTS: [&str; 3] = ["production", "staging", "development"];
pub const DEFAULT_TICKET_PATTERN: &str = "^.*$";

const PRODUCTION: &str = "production";
const STAGING: &str = "staging";
const DEVELOPMENT: &str = "development";

/// Input for the event use case.
#[derive(Clone, Debug)]
pub struct EventInput<'a> {
    pub config_text: &'a str,
    pub overrides: Overrides,
    /// GitHub event name, e.g. `pull_request` or `push`.
    pub event_name: &'a str,
    pub payload: Value,
    pub repo_policy: Value,
    /// Environments the repository defines; [`DEFAULT_ENVIRONMENTS`] when empty.
    pub environments: Vec<String>,
}

/// Map the event to an input document and run a decision query against it.
pub fn run_event(input: EventInput<'_>) -> anyhow::Result<QueryOutput> {
    let environments = (!input.environments.is_empty()).then_some(input.environments.as_slice());
    let document = build_policy_input(
        input.event_name,
        &input.payload,
        &input.repo_policy,
        environments,
    );
    tracing::debug!(
        event = input.event_name,
        environment = document["environment"].as_str().unwrap_or_default(),
        "event mapped to policy input"
    );
    run_query(QueryInput {
        config_text: input.config_text,
        overrides: input.overrides,
        input: document,
        query: Query::Decision,
    })
}

/// Build the input document a deploy policy consumes from a GitHub event payload.
///
/// - `pull_request`: environment from the base branch, ticket refs from title and body,
///   approvers from `APPROVED` reviews, checks and counters from the payload
/// - `push`: environment from the pushed ref, ticket refs from commit messages
/// - anything else: `production` with empty workflow metadata
pub fn build_policy_input(
    event_name: &str,
    payload: &Value,
    repo_policy: &Value,
    repo_environments: Option<&[String]>,
) -> Value {
    let repo_environments: Vec<Value> = match repo_environments {
        Some(envs) => envs.iter().map(|e| Value::String(e.clone())).collect(),
        None => DEFAULT_ENVIRONMENTS.iter().map(|e| json!(e)).collect(),
    };

    let meta = match event_name {
        "pull_request" => pull_request_meta(payload, repo_policy),
        "push" => push_meta(payload, repo_policy),
        _ => Meta {
            environment: PRODUCTION,
            git_ref: str_at(payload, "/ref").to_string(),
            ..Meta::default()
        },
    };

    json!({
        "environment": meta.environment,
        "ref": meta.git_ref,
        "repo_policy": repo_policy,
        "repo_environments": repo_environments,
        "workflow_meta": {
            "ticket_refs": meta.ticket_refs,
            "approvers": meta.approvers,
            "checks": {"tests": meta.tests},
            "signed_off": meta.signed_off,
            "deployments_today": meta.deployments_today,
        },
    })
}

#[derive(Debug, Default)]
struct Meta {
    environment: &'static str,
    git_ref: String,
    ticket_refs: Vec<String>,
    approvers: Vec<String>,
    tests: bool,
    signed_off: bool,
    deployments_today: u64,
}

fn pull_request_meta(payload: &Value, repo_policy: &Value) -> Meta {
    let pr = payload.get("pull_request").unwrap_or(&Value::Null);
    let environment = match str_at(pr, "/base/ref") {
        "main" => PRODUCTION,
        "develop" | "development" | "dev" => STAGING,
        _ => DEVELOPMENT,
    };
    let text = format!("{}\n{}", str_at(pr, "/title"), str_at(pr, "/body"));

    Meta {
        environment,
        git_ref: str_at(pr, "/head/ref").to_string(),
        ticket_refs: ticket_refs(&text, &ticket_pattern(repo_policy, environment)),
        approvers: approvers(pr),
        tests: payload.pointer("/checks/tests").is_some_and(truthy),
        signed_off: payload.get("signed_off").is_some_and(truthy),
        deployments_today: payload.get("deployments_today").map_or(0, count),
    }
}

fn push_meta(payload: &Value, repo_policy: &Value) -> Meta {
    let git_ref = str_at(payload, "/ref");
    let environment = match git_ref {
        "refs/heads/main" => PRODUCTION,
        "refs/heads/develop" | "refs/heads/development" | "refs/heads/dev" => STAGING,
        _ => DEVELOPMENT,
    };
    let messages: Vec<&str> = payload
        .get("commits")
        .and_then(Value::as_array)
        .map(|commits| commits.iter().map(|c| str_at(c, "/message")).collect())
        .unwrap_or_default();
    let head = messages.first().copied().unwrap_or_default();
    let text = format!("{head}\n{}", messages.join("\n"));

    Meta {
        environment,
        git_ref: git_ref.to_string(),
        ticket_refs: ticket_refs(&text, &ticket_pattern(repo_policy, environment)),
        ..Meta::default()
    }
}

fn ticket_pattern(repo_policy: &Value, environment: &str) -> String {
    repo_policy
        .pointer(&format!("/policy/environments/{environment}/rules/ticket_pattern"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TICKET_PATTERN)
        .to_string()
}

/// Every match of `pattern` in `text`. With capture groups, the first group of each match.
/// An invalid pattern falls back to [`DEFAULT_TICKET_PATTERN`].
fn ticket_refs(text: &str, pattern: &str) -> Vec<String> {
    let rx = match Regex::new(pattern) {
        Ok(rx) => rx,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid ticket pattern, matching everything");
            match Regex::new(DEFAULT_TICKET_PATTERN) {
                Ok(rx) => rx,
                Err(_) => return Vec::new(),
            }
        }
    };
    // `$` also matches just before a final newline.
    let text = if rx.as_str().contains('$') {
        text.strip_suffix('\n').unwrap_or(text)
    } else {
        text
    };
    if rx.captures_len() > 1 {
        rx.captures_iter(text)
            .map(|c| c.get(1).map_or("", |m| m.as_str()).to_string())
            .collect()
    } else {
        rx.find_iter(text).map(|m| m.as_str().to_string()).collect()
    }
}

fn approvers(pr: &Value) -> Vec<String> {
    pr.get("reviews")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|r| r.get("state").and_then(Value::as_str) == Some("APPROVED"))
        .filter_map(|r| r.pointer("/user/login").and_then(Value::as_str))
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .collect()
}

fn str_at<'a>(v: &'a Value, pointer: &str) -> &'a str {
    v.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn count(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_policy() -> Value {
        json!({
            "policy": {"environments": {
                "production": {"rules": {"ticket_pattern": "[A-Z]+-\\d+", "approvals_required": 2}},
                "staging": {"rules": {"ticket_pattern": "(OPS)-(\\d+)"}}
            }}
        })
    }

    fn pr(base: &str) -> Value {
        json!({
            "pull_request": {
                "head": {"ref": "feature/x"},
                "base": {"ref": base},
                "title": "ABC-12 ship it",
                "body": "Also fixes XYZ-7",
                "reviews": [
                    {"state": "APPROVED", "user": {"login": "alice"}},
                    {"state": "COMMENTED", "user": {"login": "bob"}},
                    {"state": "APPROVED", "user": {"login": "carol"}},
                    {"state": "APPROVED", "user": {}}
                ]
            },
            "checks": {"tests": true},
            "signed_off": true,
            "deployments_today": 3
        })
    }

    #[test]
    fn pull_request_to_main_is_production() {
        let doc = build_policy_input("pull_request", &pr("main"), &repo_policy(), None);
        assert_eq!(doc["environment"], "production");
        assert_eq!(doc["ref"], "feature/x");
        assert_eq!(doc["repo_environments"], json!(["production", "staging", "development"]));
        assert_eq!(
            doc["workflow_meta"],
            json!({
                "ticket_refs": ["ABC-12", "XYZ-7"],
                "approvers": ["alice", "carol"],
                "checks": {"tests": true},
                "signed_off": true,
                "deployments_today": 3
            })
        );
        assert_eq!(doc["repo_policy"], repo_policy());
    }

    #[test]
    fn base_branch_selects_environment() {
        for (base, env) in [
            ("develop", "staging"),
            ("development", "staging"),
            ("dev", "staging"),
            ("release", "development"),
            ("", "development"),
        ] {
            let doc = build_policy_input("pull_request", &pr(base), &repo_policy(), None);
            assert_eq!(doc["environment"], env, "base {base:?}");
        }
    }

    #[test]
    fn capture_groups_yield_the_first_group() {
        let mut payload = pr("develop");
        payload["pull_request"]["title"] = json!("OPS-1 and OPS-22");
        let doc = build_policy_input("pull_request", &payload, &repo_policy(), None);
        assert_eq!(doc["workflow_meta"]["ticket_refs"], json!(["OPS", "OPS"]));
    }

    #[test]
    fn invalid_pattern_falls_back_to_match_all() {
        let rules = json!({"rules": {"ticket_pattern": "(["}});
        let policy = json!({"policy": {"environments": {"development": rules}}});
        let payload = json!({"pull_request": {"title": "anything", "body": ""}});
        let doc = build_policy_input("pull_request", &payload, &policy, None);
        assert_eq!(doc["workflow_meta"]["ticket_refs"], json!(["anything"]));

        // `^.*$` is not multi-line: a title with a body does not match.
        let payload = json!({"pull_request": {"title": "a", "body": "b"}});
        let doc = build_policy_input("pull_request", &payload, &policy, None);
        assert_eq!(doc["workflow_meta"]["ticket_refs"], json!([]));

        assert_eq!(ticket_refs("one line", "(["), vec!["one line".to_string()]);
    }

    #[test]
    fn end_anchor_accepts_a_final_newline() {
        assert_eq!(ticket_refs("title\n", "^.*$"), vec!["title".to_string()]);
        assert_eq!(ticket_refs("\n", "^.*$"), vec![String::new()]);
        assert_eq!(ticket_refs("a\nb\n", "^.*$"), Vec::<String>::new());
        assert_eq!(ticket_refs("PROJ-7\n", r"([A-Z]+-\d+)$"), vec!["PROJ-7".to_string()]);
        // Without `$` the newline stays part of the text.
        assert_eq!(ticket_refs("PROJ-7\n", r"[A-Z]+-\d+\s"), vec!["PROJ-7\n".to_string()]);
    }

    #[test]
    fn missing_pull_request_fields_use_defaults() {
        let doc = build_policy_input("pull_request", &json!({}), &json!({}), None);
        assert_eq!(doc["environment"], "development");
        assert_eq!(doc["ref"], "");
        assert_eq!(doc["workflow_meta"]["approvers"], json!([]));
        assert_eq!(doc["workflow_meta"]["checks"]["tests"], false);
        assert_eq!(doc["workflow_meta"]["signed_off"], false);
        assert_eq!(doc["workflow_meta"]["deployments_today"], 0);
    }

    #[test]
    fn push_maps_ref_and_commit_messages() {
        let payload = json!({
            "ref": "refs/heads/main",
            "commits": [{"message": "ABC-1 first"}, {"message": "ABC-2 second"}]
        });
        let doc = build_policy_input("push", &payload, &repo_policy(), None);
        assert_eq!(doc["environment"], "production");
        assert_eq!(doc["ref"], "refs/heads/main");
        assert_eq!(
            doc["workflow_meta"]["ticket_refs"],
            json!(["ABC-1", "ABC-1", "ABC-2"])
        );
        assert_eq!(doc["workflow_meta"]["approvers"], json!([]));
        assert_eq!(doc["workflow_meta"]["signed_off"], false);

        let doc = build_policy_input("push", &json!({"ref": "refs/heads/dev"}), &json!({}), None);
        assert_eq!(doc["environment"], "staging");
        let doc = build_policy_input("push", &json!({"ref": "refs/tags/v1"}), &json!({}), None);
        assert_eq!(doc["environment"], "development");
    }

    #[test]
    fn other_events_are_production_with_empty_meta() {
        let envs = vec!["prod".to_string()];
        let doc = build_policy_input(
            "workflow_dispatch",
            &json!({"ref": "refs/heads/x"}),
            &json!({}),
            Some(envs.as_slice()),
        );
        assert_eq!(doc["environment"], "production");
        assert_eq!(doc["ref"], "refs/heads/x");
        assert_eq!(doc["repo_environments"], json!(["prod"]));
        assert_eq!(doc["workflow_meta"]["ticket_refs"], json!([]));
        assert_eq!(doc["workflow_meta"]["deployments_today"], 0);
    }

    #[test]
    fn counts_are_lenient() {
        assert_eq!(count(&json!(4)), 4);
        assert_eq!(count(&json!(2.9)), 2);
        assert_eq!(count(&json!(-3)), 0);
        assert_eq!(count(&json!("7")), 7);
        assert_eq!(count(&json!(null)), 0);
    }
}
