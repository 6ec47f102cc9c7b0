//! Runtime configuration.
//!
//! Built in code, from `RESTRUCTURE_*` environment variables or from a YAML
//! file. Every constructor validates before handing the config out.

use crate::errors::{RestructureError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use ts_syntax::{ProjectOptions, discover::build_globset};

pub const ENV_DRY: &str = "RESTRUCTURE_DRY";
pub const ENV_CWD: &str = "RESTRUCTURE_CWD";
/// Comma-separated include globs.
pub const ENV_INCLUDE: &str = "RESTRUCTURE_INCLUDE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestructureConfig {
    /// Log every operation but leave storage untouched.
    pub dry: bool,
    /// Root every relative path is resolved against.
    pub cwd: PathBuf,
    pub project: ProjectOptions,
}

impl Default for RestructureConfig {
    fn default() -> Self {
        Self {
            dry: false,
            cwd: PathBuf::from("."),
            project: ProjectOptions::default(),
        }
    }
}

impl RestructureConfig {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    pub fn with_dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    /// Defaults overridden by whichever `RESTRUCTURE_*` variables are set.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(dry) = env_opt_bool(ENV_DRY)? {
            cfg.dry = dry;
        }
        if let Some(cwd) = env_opt(ENV_CWD) {
            cfg.cwd = PathBuf::from(cwd);
        }
        if let Some(include) = env_opt(ENV_INCLUDE) {
            cfg.project.include = include
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cfg: Self = serde_yml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RestructureError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<()> {
        if self.cwd.as_os_str().is_empty() {
            return Err(RestructureError::Config("cwd is empty".into()));
        }
        if !self.cwd.is_dir() {
            return Err(RestructureError::Config(format!(
                "cwd is not a directory: {}",
                self.cwd.display()
            )));
        }
        if self.project.include.is_empty() {
            return Err(RestructureError::Config("project.include is empty".into()));
        }
        build_globset(&self.project.include)
            .and_then(|_| build_globset(&self.project.ignore))
            .map_err(|e| RestructureError::Config(e.to_string()))?;
        if let Some(indent) = &self.project.indent {
            if indent.is_empty() || !indent.chars().all(|c| c == ' ' || c == '\t') {
                return Err(RestructureError::Config(
                    "project.indent must be non-empty whitespace".into(),
                ));
            }
        }
        Ok(())
    }
}

fn env_opt(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_opt_bool(name: &'static str) -> Result<Option<bool>> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(RestructureError::Config(format!(
                "{name} must be a boolean, got `{v}`"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "dry: true\ncwd: {}\nproject:\n  include: [\"src/**/*.ts\"]\n  indent: \"  \"\n",
            dir.path().display()
        );
        let cfg = RestructureConfig::from_yaml_str(&yaml).unwrap();
        assert!(cfg.dry);
        assert_eq!(cfg.project.include, vec!["src/**/*.ts".to_string()]);
        assert_eq!(cfg.project.indent.as_deref(), Some("  "));
        assert_eq!(cfg.project.ignore, ProjectOptions::default().ignore);
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = RestructureConfig::new(dir.path());
        assert!(cfg.validate().is_ok());

        cfg.project.include = vec!["src/[".to_string()];
        assert!(matches!(cfg.validate(), Err(RestructureError::Config(_))));

        cfg.project.include = ProjectOptions::default().include;
        cfg.project.indent = Some("x".to_string());
        assert!(cfg.validate().is_err());

        let missing = RestructureConfig::new(dir.path().join("missing"));
        assert!(missing.validate().is_err());
    }
}
