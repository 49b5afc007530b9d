//! Configuration for scc-lint.
//!
//! Looked up in this order:
//! - the `--config` path
//! - `.scc-lint.yaml` (or `.yml`) in the working directory
//! - `~/.scc-lint.yaml`
//!
//! Command-line flags override whatever the file sets.

use crate::analyzer::scclint::rules::get_rule;
use crate::error::{Result, SccLintError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAMES: &[&str] = &[".scc-lint.yaml", ".scc-lint.yml"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SccLintConfig {
    /// Rule codes to skip.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// If true, a failing verdict still exits 0.
    #[serde(default)]
    pub no_fail: bool,

    /// Baseline SCC: a file path or a built-in name.
    #[serde(default)]
    pub baseline: Option<String>,

    /// Worker threads for batch mode.
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl SccLintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, rule: impl Into<String>) -> Self {
        self.exclude.push(rule.into());
        self
    }

    pub fn is_rule_excluded(&self, code: &str) -> bool {
        self.exclude.iter().any(|e| e == code)
    }

    pub fn load_from_str(content: &str, path: &Path) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| SccLintError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if config.jobs == Some(0) {
            return Err(SccLintError::Config {
                path: path.to_path_buf(),
                message: "jobs must be at least 1".to_string(),
            });
        }
        for code in config.exclude.iter().filter(|c| get_rule(c).is_none()) {
            warn!("{}: excluded rule '{}' does not exist", path.display(), code);
        }
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SccLintError::io(path, e))?;
        Self::load_from_str(&content, path)
    }

    /// Load the first config file found in the working directory or home
    /// directory, or the defaults when there is none.
    pub fn load_from_default() -> Result<Self> {
        match Self::find_default_path() {
            Some(path) => {
                debug!("using config {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Load `explicit` if given, otherwise search the default locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::load_from_default(),
        }
    }

    fn find_default_path() -> Option<PathBuf> {
        let mut dirs_to_search = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            dirs_to_search.push(cwd);
        }
        if let Some(home) = dirs::home_dir() {
            dirs_to_search.push(home);
        }
        dirs_to_search
            .iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
exclude:
  - host-namespaces
noFail: true
baseline: restricted-v2
jobs: 4
"#;
        let config = SccLintConfig::load_from_str(yaml, Path::new("cfg.yaml")).unwrap();
        assert!(config.is_rule_excluded("host-namespaces"));
        assert!(!config.is_rule_excluded("pod-uid-in-range"));
        assert!(config.no_fail);
        assert_eq!(config.baseline.as_deref(), Some("restricted-v2"));
        assert_eq!(config.jobs, Some(4));
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = SccLintConfig::load_from_str("{}", Path::new("cfg.yaml")).unwrap();
        assert_eq!(config, SccLintConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let err = SccLintConfig::load_from_str("noFail: maybe", Path::new("cfg.yaml")).unwrap_err();
        assert!(matches!(err, SccLintError::Config { .. }));
        assert_eq!(err.exit_code(), 2);

        assert!(SccLintConfig::load_from_str("jobs: 0", Path::new("cfg.yaml")).is_err());
        assert!(SccLintConfig::load_from_str("unknownKey: 1", Path::new("cfg.yaml")).is_err());
    }

    #[test]
    fn test_builder() {
        let config = SccLintConfig::new().exclude("no-run-as-any");
        assert!(config.is_rule_excluded("no-run-as-any"));
        assert!(!config.is_rule_excluded("fsgroup-in-range"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".scc-lint.yaml");
        std::fs::write(&path, "exclude: [no-run-as-any]\n").unwrap();
        let config = SccLintConfig::load(Some(&path)).unwrap();
        assert_eq!(config.exclude, vec!["no-run-as-any".to_string()]);

        let missing = SccLintConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(missing, SccLintError::Io { .. }));
    }
}
