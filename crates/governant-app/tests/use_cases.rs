//! Query and event use cases end to end, against the fixture module and shell stubs.

use governant_app::{
    EventInput, Outcome, Query, QueryInput, error_exit_code, outcome_exit_code, render, run_event,
    run_query,
};
use governant_settings::{OutputFormat, Overrides};
use governant_test_util::utf8_path;
use serde_json::json;

#[cfg(feature = "embedded")]
mod embedded {
    use super::*;
    use governant_test_util::wasm_fixture;

    fn overrides(dir: &camino::Utf8Path) -> Overrides {
        let artifact = wasm_fixture::write_fixture(dir, "fixture.wasm").expect("fixture");
        Overrides {
            artifact: Some(artifact),
            package: Some(wasm_fixture::PACKAGE.to_string()),
            mode: Some("embedded".to_string()),
            ..Overrides::default()
        }
    }

    #[test]
    fn decision_query_through_config_and_overrides() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let out = run_query(QueryInput {
            config_text: "format = \"text\"\n",
            overrides: overrides(&utf8_path(tmp.path())),
            input: json!({}),
            query: Query::Decision,
        })
        .expect("run query");

        assert_eq!(out.outcome, Outcome::ViolationsFound);
        assert_eq!(out.resolved_config.format, OutputFormat::Text);
        assert_eq!(
            render(&out.report, out.resolved_config.format),
            "DENY\nViolations:\n- [tests_failed] tests must pass\n"
        );
        assert_eq!(outcome_exit_code(out.outcome, true), 3);
    }

    #[test]
    fn allow_and_evaluate_queries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let overrides = overrides(&utf8_path(tmp.path()));

        let out = run_query(QueryInput {
            config_text: "",
            overrides: overrides.clone(),
            input: json!({}),
            query: Query::Allow,
        })
        .expect("allow");
        assert_eq!(out.outcome, Outcome::Allowed);
        assert_eq!(render(&out.report, OutputFormat::Json), "{\"allow\":true}\n");

        let out = run_query(QueryInput {
            config_text: "",
            overrides,
            input: json!({"k": "v"}),
            query: Query::Evaluate {
                entrypoint: "fixture/echo".to_string(),
            },
        })
        .expect("evaluate");
        assert_eq!(out.outcome, Outcome::Evaluated);
        assert_eq!(render(&out.report, OutputFormat::Json), "{\"k\":\"v\"}\n");
    }

    #[test]
    fn evaluation_failures_exit_with_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = run_query(QueryInput {
            config_text: "",
            overrides: overrides(&utf8_path(tmp.path())),
            input: json!({}),
            query: Query::Evaluate {
                entrypoint: "fixture.abort".to_string(),
            },
        })
        .expect_err("abort");
        assert_eq!(error_exit_code(&err), 1);
        assert!(format!("{err:#}").contains("fixture abort"), "{err:#}");
    }

    #[test]
    fn index_selects_the_named_policy() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = utf8_path(tmp.path());
        wasm_fixture::write_fixture(&root, "fixture.wasm").expect("fixture");
        let index = root.join("index.json");
        std::fs::write(
            &index,
            json!([{"name": "fx", "artifact": "fixture.wasm", "package": "fixture"}]).to_string(),
        )
        .expect("write index");

        let query = |policy: &str| {
            run_query(QueryInput {
                config_text: "",
                overrides: Overrides {
                    index: Some(index.clone()),
                    policy: Some(policy.to_string()),
                    ..Overrides::default()
                },
                input: json!({}),
                query: Query::Allow,
            })
        };
        assert_eq!(query("fx").expect("known").outcome, Outcome::Allowed);
        let err = query("missing").expect_err("unknown policy");
        assert!(format!("{err:#}").contains("policy not registered: missing"), "{err:#}");
    }
}

#[cfg(unix)]
#[test]
fn event_use_case_sends_the_mapped_document() {
    use governant_test_util::stub_tool;

    let tmp = tempfile::tempdir().expect("tempdir");
    let root = utf8_path(tmp.path());
    let stub = stub_tool::answering(
        &root,
        &[
            ("allow", r#"{"result":[{"expressions":[{"value":true}]}]}"#),
            ("violations", r#"{"result":[{"expressions":[{"value":[]}]}]}"#),
        ],
    )
    .expect("stub");
    let bundle = root.join("deploy.tar.gz");
    std::fs::write(&bundle, b"").expect("bundle");

    let out = run_event(EventInput {
        config_text: "",
        overrides: Overrides {
            artifact: Some(bundle),
            package: Some("github.deploy".to_string()),
            opa: Some(stub.path.to_string()),
            ..Overrides::default()
        },
        event_name: "push",
        payload: json!({"ref": "refs/heads/develop", "commits": []}),
        repo_policy: json!({"policy": {}}),
        environments: vec!["staging".to_string()],
    })
    .expect("run event");
    assert_eq!(out.outcome, Outcome::Allowed);

    let seen: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(format!("{}.input", stub.log)).expect("stub input"),
    )
    .expect("json");
    assert_eq!(seen["environment"], "staging");
    assert_eq!(seen["ref"], "refs/heads/develop");
    assert_eq!(seen["repo_environments"], json!(["staging"]));
}

#[test]
fn malformed_config_exits_invalid() {
    let err = run_query(QueryInput {
        config_text: "mode = \"turbo\"\nartifact = \"p.wasm\"\npackage = \"p\"\n",
        overrides: Overrides::default(),
        input: json!({}),
        query: Query::Allow,
    })
    .expect_err("bad mode");
    assert_eq!(error_exit_code(&err), 4);
    assert!(format!("{err:#}").contains("unknown mode: turbo"), "{err:#}");
}
