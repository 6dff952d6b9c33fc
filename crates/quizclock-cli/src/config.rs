//! quizclock configuration file and environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizclock_core::model::{Difficulty, Mode};

/// Report formats written after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
    Markdown,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Parse `json`, `html`, `markdown`, a comma-separated list of them, or `all`.
pub fn parse_formats(s: &str) -> Result<Vec<ReportFormat>> {
    if s.trim() == "all" {
        return Ok(vec![
            ReportFormat::Json,
            ReportFormat::Html,
            ReportFormat::Markdown,
        ]);
    }

    let mut formats = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let format = match part {
            "json" => ReportFormat::Json,
            "html" => ReportFormat::Html,
            "markdown" | "md" => ReportFormat::Markdown,
            other => anyhow::bail!("unknown report format: '{other}'"),
        };
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    anyhow::ensure!(!formats.is_empty(), "at least one report format is required");
    Ok(formats)
}

/// Top-level quizclock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizclockConfig {
    /// Mode used when `--mode` is not given.
    #[serde(default)]
    pub default_mode: Mode,
    /// Difficulty used when `--difficulty` is not given.
    #[serde(default)]
    pub default_difficulty: Difficulty,
    /// Output directory for reports and snapshots.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report formats, as accepted by [`parse_formats`].
    #[serde(default = "default_report_format")]
    pub report_format: String,
    /// Append activity events to this JSON-lines file.
    #[serde(default)]
    pub activity_log: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizclock-results")
}
fn default_report_format() -> String {
    "json".to_string()
}

impl Default for QuizclockConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            default_difficulty: Difficulty::default(),
            output_dir: default_output_dir(),
            report_format: default_report_format(),
            activity_log: None,
        }
    }
}

/// Expand `${VAR}` references from the environment. Unset variables expand to
/// nothing; substituted values are not expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&std::env::var(&rest[start + 2..start + len]).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `quizclock.toml` in the current directory
/// 2. `~/.config/quizclock/config.toml`
///
/// Environment variable overrides: `QUIZCLOCK_OUTPUT_DIR`, `QUIZCLOCK_MODE`.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizclockConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizclock.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<QuizclockConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => QuizclockConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut QuizclockConfig) -> Result<()> {
    if let Ok(dir) = std::env::var("QUIZCLOCK_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Ok(mode) = std::env::var("QUIZCLOCK_MODE") {
        config.default_mode = mode.parse().context("invalid QUIZCLOCK_MODE")?;
    }

    config.output_dir = resolve_path(&config.output_dir);
    config.activity_log = config.activity_log.as_deref().map(resolve_path);
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizclock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZCLOCK_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZCLOCK_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZCLOCK_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("unterminated ${"), "unterminated ${");
        assert_eq!(resolve_env_vars("${_QUIZCLOCK_UNSET_VAR}/out"), "/out");
        std::env::remove_var("_QUIZCLOCK_TEST_VAR");
    }

    #[test]
    fn self_referencing_value_expands_once() {
        std::env::set_var("_QUIZCLOCK_LOOP_VAR", "${_QUIZCLOCK_LOOP_VAR}");
        assert_eq!(
            resolve_env_vars("a/${_QUIZCLOCK_LOOP_VAR}/b"),
            "a/${_QUIZCLOCK_LOOP_VAR}/b"
        );
        std::env::remove_var("_QUIZCLOCK_LOOP_VAR");
    }

    #[test]
    fn env_overrides_output_dir_and_mode() {
        let mut config = QuizclockConfig::default();
        std::env::set_var("QUIZCLOCK_OUTPUT_DIR", "/tmp/quizclock-env-results");
        std::env::set_var("QUIZCLOCK_MODE", "exam");
        let applied = apply_env_overrides(&mut config);

        std::env::set_var("QUIZCLOCK_MODE", "marathon");
        let mut rejected = QuizclockConfig::default();
        let err = apply_env_overrides(&mut rejected).unwrap_err();

        std::env::remove_var("QUIZCLOCK_OUTPUT_DIR");
        std::env::remove_var("QUIZCLOCK_MODE");

        applied.unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/quizclock-env-results"));
        assert_eq!(config.default_mode, Mode::Exam);
        assert!(err.to_string().contains("invalid QUIZCLOCK_MODE"));
    }

    #[test]
    fn default_config() {
        let config = QuizclockConfig::default();
        assert_eq!(config.default_mode, Mode::Practice);
        assert_eq!(config.default_difficulty, Difficulty::Medium);
        assert_eq!(config.report_format, "json");
        assert!(config.activity_log.is_none());
    }

    #[test]
    fn parse_config_file() {
        let toml_str = r#"
default_mode = "exam"
default_difficulty = "hard"
output_dir = "results"
report_format = "json,html"
activity_log = "activity.jsonl"
"#;
        let config: QuizclockConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_mode, Mode::Exam);
        assert_eq!(config.default_difficulty, Difficulty::Hard);
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(
            parse_formats(&config.report_format).unwrap(),
            vec![ReportFormat::Json, ReportFormat::Html]
        );
    }

    #[test]
    fn format_lists() {
        assert_eq!(parse_formats("all").unwrap().len(), 3);
        assert_eq!(
            parse_formats("md, json, md").unwrap(),
            vec![ReportFormat::Markdown, ReportFormat::Json]
        );
        assert!(parse_formats("sarif").is_err());
        assert!(parse_formats(" , ").is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/no/such/quizclock.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
