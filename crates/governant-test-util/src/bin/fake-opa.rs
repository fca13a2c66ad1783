//! Stand-in for the `opa` command line, answering `eval` from the reference deploy policy.
//!
//! Accepts `eval --format json --bundle <bundle> -i <input> <entrypoint>` and `version`.
//! Output mirrors `opa eval --format json`: a result envelope, `{}` when the rule is
//! undefined, and `{"errors": [...]}` with exit status 1 on failure.

use governant_test_util::deploy_policy;
use serde_json::{Value, json};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("version") => {
            println!("Version: 0.0.0-fake");
            ExitCode::SUCCESS
        }
        Some("eval") => match eval(&args[1..]) {
            Ok(out) => {
                println!("{out}");
                ExitCode::SUCCESS
            }
            Err(message) => {
                println!("{}", json!({"errors": [{"message": message}]}));
                ExitCode::from(1)
            }
        },
        _ => {
            eprintln!(
                "usage: fake-opa eval --format json --bundle <bundle> -i <input> <entrypoint>"
            );
            ExitCode::from(2)
        }
    }
}

fn eval(args: &[String]) -> Result<Value, String> {
    let mut bundle = None;
    let mut input = None;
    let mut entrypoint = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" => {
                let format = iter.next().ok_or("--format needs a value")?;
                if format != "json" {
                    return Err(format!("unsupported format: {format}"));
                }
            }
            "--bundle" | "-b" => bundle = iter.next(),
            "--input" | "-i" => input = iter.next(),
            other => entrypoint = Some(other),
        }
    }

    let bundle = bundle.ok_or("missing --bundle")?;
    if !Path::new(bundle).exists() {
        return Err(format!("bundle {bundle}: no such file or directory"));
    }
    let input: Value = match input {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| format!("input {path}: {e}"))?;
            serde_json::from_str(&text).map_err(|e| format!("input {path}: {e}"))?
        }
        None => Value::Null,
    };
    let entrypoint = entrypoint.ok_or("missing query")?;

    Ok(match deploy_policy::evaluate(entrypoint, &input) {
        Some(value) => json!({
            "result": [{"expressions": [{
                "value": value,
                "text": entrypoint,
                "location": {"row": 1, "col": 1}
            }]}]
        }),
        None => json!({}),
    })
}
