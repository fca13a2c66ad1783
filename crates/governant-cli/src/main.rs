//! CLI entry point for governant.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and exit codes.
//! All business logic lives in the `governant-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use governant_app::{
    EventInput, Query, QueryInput, QueryOutput, error_exit_code, outcome_exit_code,
    parse_input_document, parse_json_document, render, run_event, run_query,
};
use governant_engine::{EMBEDDED_AVAILABLE, PolicyError};
use governant_settings::{DEFAULT_OPA_TOOL, Overrides};
use governant_types::PolicyIndex;
use governant_types::ids::{EXIT_ERROR, EXIT_INVALID_INPUT, EXIT_OK};
use serde_json::json;
use std::io::{Read, Write};

const DEFAULT_CONFIG: &str = "governant.toml";

#[derive(Parser, Debug)]
#[command(
    name = "governant",
    version,
    about = "Policy decisions for deployment workflows, backed by OPA"
)]
struct Cli {
    /// Path to a governant config TOML (default: ./governant.toml if present).
    #[arg(long, global = true, env = "GOVERNANT_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Policy index file (JSON array of registration records).
    #[arg(long, global = true, env = "POLICY_INDEX")]
    index: Option<Utf8PathBuf>,

    /// Policy artifact: a compiled module, a bundle archive, or a bundle directory.
    #[arg(long, global = true, env = "POLICY_ARTIFACT")]
    artifact: Option<Utf8PathBuf>,

    /// Default package for --artifact, e.g. github.deploy.
    #[arg(long, global = true, env = "POLICY_PACKAGE")]
    package: Option<String>,

    /// Policy name (required with --index).
    #[arg(long, global = true, env = "POLICY_NAME")]
    policy: Option<String>,

    /// Backend mode (auto|embedded|external).
    #[arg(long, global = true, env = "POLICY_MODE")]
    mode: Option<String>,

    /// Input document path, or `-` for stdin (default: stdin).
    #[arg(short, long, global = true, env = "POLICY_INPUT")]
    input: Option<String>,

    /// External evaluation tool (name on PATH or a path).
    #[arg(long, global = true, env = "POLICY_OPA")]
    opa: Option<String>,

    /// Output format (json|pretty|text|markdown|github).
    #[arg(long, global = true, env = "POLICY_FORMAT")]
    format: Option<String>,

    /// Exit 2 on deny and 3 when violations are present.
    #[arg(long, global = true)]
    strict_exit: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, env = "GOVERNANT_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate `<package>.allow`.
    Allow,

    /// Evaluate `<package>.violations`.
    Violations,

    /// Evaluate both and combine them: allowed only when allow holds and nothing is violated.
    Decision,

    /// Evaluate any entrypoint and print the raw result.
    Evaluate {
        /// Entrypoint, e.g. data.github.deploy.allow or github/deploy/allow.
        #[arg(short, long)]
        entrypoint: String,
    },

    /// Map a GitHub event payload to a policy input and print the decision.
    Event {
        /// Path to the event payload JSON.
        payload: Utf8PathBuf,

        /// GitHub event name (pull_request, push, ...).
        #[arg(long)]
        event_name: String,

        /// Path to the repository policy JSON.
        #[arg(long)]
        repo_policy: Utf8PathBuf,

        /// Environments the repository defines (repeatable).
        #[arg(long = "environment")]
        environments: Vec<String>,
    },

    /// Print the JSON schema of the policy index file.
    Schema,

    /// Print version and backend availability.
    Version,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(EXIT_INVALID_INPUT);
        }
    };

    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("governant: error: {err:#}");
        std::process::exit(EXIT_ERROR);
    }

    let code = match run(&cli) {
        Ok((stdout, code)) => match write_stdout(&stdout) {
            Ok(()) => code,
            Err(err) => {
                eprintln!("governant: error: {err:#}");
                EXIT_ERROR
            }
        },
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("governant: error: {err:#}");
            error_exit_code(&err)
        }
    };
    std::process::exit(code);
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

/// Run the command; returns what to print on stdout and the exit code.
fn run(cli: &Cli) -> anyhow::Result<(String, i32)> {
    let query = match &cli.cmd {
        Commands::Allow => Query::Allow,
        Commands::Violations => Query::Violations,
        Commands::Decision => Query::Decision,
        Commands::Evaluate { entrypoint } => Query::Evaluate {
            entrypoint: entrypoint.clone(),
        },
        Commands::Event {
            payload,
            event_name,
            repo_policy,
            environments,
        } => return cmd_event(cli, payload, event_name, repo_policy, environments),
        Commands::Schema => return cmd_schema(),
        Commands::Version => return Ok((cmd_version(cli), EXIT_OK)),
    };

    let config_text = read_config(cli.config.as_deref())?;
    let input = read_input(cli.input.as_deref())?;
    let output = run_query(QueryInput {
        config_text: &config_text,
        overrides: overrides(cli),
        input,
        query,
    })?;
    Ok(finish(cli, &output))
}

fn cmd_event(
    cli: &Cli,
    payload: &Utf8Path,
    event_name: &str,
    repo_policy: &Utf8Path,
    environments: &[String],
) -> anyhow::Result<(String, i32)> {
    let config_text = read_config(cli.config.as_deref())?;
    let payload_doc = parse_json_document("event payload", &read_file(payload)?)?;
    let policy_doc = parse_json_document("repository policy", &read_file(repo_policy)?)?;

    let output = run_event(EventInput {
        config_text: &config_text,
        overrides: overrides(cli),
        event_name,
        payload: payload_doc,
        repo_policy: policy_doc,
        environments: environments.to_vec(),
    })?;
    Ok(finish(cli, &output))
}

fn cmd_schema() -> anyhow::Result<(String, i32)> {
    let schema = schemars::schema_for!(PolicyIndex);
    let text = serde_json::to_string_pretty(&schema).context("serialize schema")?;
    Ok((format!("{text}\n"), EXIT_OK))
}

fn cmd_version(cli: &Cli) -> String {
    let tool = cli.opa.as_deref().unwrap_or(DEFAULT_OPA_TOOL);
    let opa = match which::which(tool) {
        Ok(path) => json!(path.display().to_string()),
        Err(_) => json!("unavailable"),
    };
    let out = json!({
        "cli": env!("CARGO_PKG_VERSION"),
        "embedded": EMBEDDED_AVAILABLE,
        "opa": opa,
    });
    format!("{out}\n")
}

fn finish(cli: &Cli, output: &QueryOutput) -> (String, i32) {
    (
        render(&output.report, output.resolved_config.format),
        outcome_exit_code(output.outcome, cli.strict_exit),
    )
}

fn overrides(cli: &Cli) -> Overrides {
    Overrides {
        index: cli.index.clone(),
        artifact: cli.artifact.clone(),
        package: cli.package.clone(),
        policy: cli.policy.clone(),
        mode: cli.mode.clone(),
        opa: cli.opa.clone(),
        format: cli.format.clone(),
    }
}

/// An explicitly named config file must exist; the default one is optional.
fn read_config(path: Option<&Utf8Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            anyhow::Error::new(PolicyError::InvalidConfig {
                reason: format!("read {path}: {e}"),
            })
        }),
        None => match std::fs::read_to_string(DEFAULT_CONFIG) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(anyhow::Error::new(PolicyError::InvalidConfig {
                reason: format!("read {DEFAULT_CONFIG}: {e}"),
            })),
        },
    }
}

fn read_input(path: Option<&str>) -> anyhow::Result<serde_json::Value> {
    let text = match path {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| PolicyError::InvalidInput {
                    reason: format!("read stdin: {e}"),
                })?;
            buf
        }
        Some(path) => read_file(Utf8Path::new(path))?,
    };
    Ok(parse_input_document(&text)?)
}

fn read_file(path: &Utf8Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| PolicyError::InvalidInput {
            reason: format!("read {path}: {e}"),
        })
        .map_err(anyhow::Error::from)
}

fn write_stdout(text: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("write stdout")
}
