use crate::model::GovernantConfigV1;
use anyhow::Context;
use camino::Utf8PathBuf;
use governant_types::Mode;

pub const DEFAULT_OPA_TOOL: &str = "opa";
pub const DEFAULT_POLICY_NAME: &str = "default";

/// Values supplied on the command line or through the environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub index: Option<Utf8PathBuf>,
    pub artifact: Option<Utf8PathBuf>,
    pub package: Option<String>,
    pub policy: Option<String>,
    pub mode: Option<String>,
    pub opa: Option<String>,
    pub format: Option<String>,
}

/// Where the policy handle comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum PolicySource {
    /// Load every record of an index file, then select `policy`.
    Index {
        path: Utf8PathBuf,
        policy: String,
        /// Forces one mode onto every record when set.
        mode: Option<Mode>,
    },
    /// Register one artifact under `name`.
    Single {
        name: String,
        artifact: Utf8PathBuf,
        package: String,
        mode: Mode,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact JSON on one line.
    #[default]
    Json,
    /// Indented JSON.
    Pretty,
    /// `ALLOW`/`DENY` plus an itemized violation list.
    Text,
    Markdown,
    /// GitHub Actions workflow commands.
    Github,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
            OutputFormat::Text => "text",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Github => "github",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub source: PolicySource,
    pub opa: String,
    pub format: OutputFormat,
}

pub fn resolve_config(
    cfg: GovernantConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    let mode = overrides
        .mode
        .or(cfg.mode)
        .map(|m| parse_mode(&m))
        .transpose()?;

    let policy = overrides.policy.or(cfg.policy);

    let source = match overrides.index.or(cfg.index) {
        Some(path) => {
            let policy = policy.context("--policy is required when --index is used")?;
            PolicySource::Index { path, policy, mode }
        }
        None => {
            let artifact = overrides
                .artifact
                .or(cfg.artifact)
                .context("either --index or --artifact must be provided")?;
            let package = overrides
                .package
                .or(cfg.package)
                .context("--package is required when --artifact is used")?;
            if package.trim().is_empty() {
                anyhow::bail!("package must not be empty");
            }
            PolicySource::Single {
                name: policy.unwrap_or_else(|| DEFAULT_POLICY_NAME.to_string()),
                artifact,
                package,
                mode: mode.unwrap_or_default(),
            }
        }
    };

    let opa = overrides
        .opa
        .or(cfg.opa)
        .unwrap_or_else(|| DEFAULT_OPA_TOOL.to_string());

    let format = match overrides.format.or(cfg.format) {
        Some(f) => parse_format(&f)?,
        None => OutputFormat::default(),
    };

    Ok(ResolvedConfig {
        source,
        opa,
        format,
    })
}

fn parse_mode(v: &str) -> anyhow::Result<Mode> {
    v.parse::<Mode>().map_err(anyhow::Error::from)
}

fn parse_format(v: &str) -> anyhow::Result<OutputFormat> {
    match v.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(OutputFormat::Json),
        "pretty" => Ok(OutputFormat::Pretty),
        "text" | "plain" => Ok(OutputFormat::Text),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "github" | "annotations" => Ok(OutputFormat::Github),
        other => anyhow::bail!(
            "unknown format: {other} (expected json|pretty|text|markdown|github)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_overrides() -> Overrides {
        Overrides {
            artifact: Some("policy/policy.wasm".into()),
            package: Some("github.deploy".to_string()),
            ..Overrides::default()
        }
    }

    #[test]
    fn single_policy_defaults() {
        let resolved =
            resolve_config(GovernantConfigV1::default(), single_overrides()).expect("resolve");
        assert_eq!(
            resolved.source,
            PolicySource::Single {
                name: "default".to_string(),
                artifact: "policy/policy.wasm".into(),
                package: "github.deploy".to_string(),
                mode: Mode::Auto,
            }
        );
        assert_eq!(resolved.opa, "opa");
        assert_eq!(resolved.format, OutputFormat::Json);
    }

    #[test]
    fn overrides_beat_config_file() {
        let cfg = GovernantConfigV1 {
            artifact: Some("from-config.wasm".into()),
            package: Some("cfg.pkg".to_string()),
            mode: Some("cli".to_string()),
            opa: Some("/opt/opa".to_string()),
            format: Some("text".to_string()),
            ..GovernantConfigV1::default()
        };
        let overrides = Overrides {
            mode: Some("wasm".to_string()),
            format: Some("markdown".to_string()),
            ..single_overrides()
        };
        let resolved = resolve_config(cfg, overrides).expect("resolve");
        match resolved.source {
            PolicySource::Single {
                artifact,
                package,
                mode,
                ..
            } => {
                assert_eq!(artifact, "policy/policy.wasm");
                assert_eq!(package, "github.deploy");
                assert_eq!(mode, Mode::Embedded);
            }
            other => panic!("unexpected source: {other:?}"),
        }
        assert_eq!(resolved.opa, "/opt/opa");
        assert_eq!(resolved.format, OutputFormat::Markdown);
    }

    #[test]
    fn index_requires_policy_name() {
        let overrides = Overrides {
            index: Some("policies.json".into()),
            ..Overrides::default()
        };
        let err = resolve_config(GovernantConfigV1::default(), overrides).unwrap_err();
        assert!(err.to_string().contains("--policy is required"));
    }

    #[test]
    fn index_wins_over_artifact() {
        let overrides = Overrides {
            index: Some("policies.json".into()),
            policy: Some("deploy".to_string()),
            ..single_overrides()
        };
        let resolved = resolve_config(GovernantConfigV1::default(), overrides).expect("resolve");
        assert_eq!(
            resolved.source,
            PolicySource::Index {
                path: "policies.json".into(),
                policy: "deploy".to_string(),
                mode: None,
            }
        );
    }

    #[test]
    fn artifact_requires_package() {
        let overrides = Overrides {
            artifact: Some("p.wasm".into()),
            ..Overrides::default()
        };
        let err = resolve_config(GovernantConfigV1::default(), overrides).unwrap_err();
        assert!(err.to_string().contains("--package is required"));
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let err = resolve_config(GovernantConfigV1::default(), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("either --index or --artifact"));
    }

    #[test]
    fn rejects_unknown_mode_and_format() {
        let overrides = Overrides {
            mode: Some("remote".to_string()),
            ..single_overrides()
        };
        let err = resolve_config(GovernantConfigV1::default(), overrides).unwrap_err();
        assert!(err.to_string().contains("unknown mode: remote"));

        let overrides = Overrides {
            format: Some("yaml".to_string()),
            ..single_overrides()
        };
        let err = resolve_config(GovernantConfigV1::default(), overrides).unwrap_err();
        assert!(err.to_string().contains("unknown format: yaml"));
    }

    #[test]
    fn parses_config_toml() {
        let cfg = crate::parse_config_toml(
            r#"
index = "policies/index.json"
policy = "deploy"
mode = "external"
"#,
        )
        .expect("parse");
        assert_eq!(cfg.index.as_deref(), Some(camino::Utf8Path::new("policies/index.json")));
        assert_eq!(cfg.mode.as_deref(), Some("external"));
    }
}
