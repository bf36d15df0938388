//! Environment profiles and workspace configuration
//!
//! Configuration is read from an [`EnvSnapshot`] captured once per invocation
//! and from the optional `.outfitter/config.toml`. Nothing here writes to the
//! process environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OutfitterError, Result, ResultExt};
use crate::logging::LogLevel;

/// Snapshot of environment variables taken at invocation start
pub type EnvSnapshot = BTreeMap<String, String>;

/// Capture the current process environment.
pub fn env_snapshot() -> EnvSnapshot {
    std::env::vars().collect()
}

/// Parse a boolean-ish environment value.
///
/// Returns `None` for values that are neither truthy nor falsy so callers can
/// fall through to the next precedence level.
pub fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// `true` when `key` is set to a truthy value in `env`.
pub fn env_flag(env: &EnvSnapshot, key: &str) -> bool {
    env.get(key).and_then(|v| parse_env_bool(v)).unwrap_or(false)
}

pub const ENV_PROFILE: &str = "OUTFITTER_ENV";
pub const ENV_VERBOSE: &str = "OUTFITTER_VERBOSE";
pub const ENV_JSON: &str = "OUTFITTER_JSON";
pub const ENV_JSONL: &str = "OUTFITTER_JSONL";

/// Deployment profile selected by `OUTFITTER_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Resolve from `OUTFITTER_ENV`, defaulting to development for unset or
    /// unrecognized values.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        env.get(ENV_PROFILE)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn defaults(self) -> EnvironmentDefaults {
        match self {
            Environment::Development => EnvironmentDefaults {
                log_level: Some(LogLevel::Debug),
                verbose: false,
                error_detail: ErrorDetail::Full,
            },
            Environment::Production => EnvironmentDefaults {
                log_level: Some(LogLevel::Info),
                verbose: false,
                error_detail: ErrorDetail::Message,
            },
            Environment::Test => EnvironmentDefaults {
                log_level: None,
                verbose: false,
                error_detail: ErrorDetail::Full,
            },
        }
    }
}

impl FromStr for Environment {
    type Err = OutfitterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(OutfitterError::validation(format!("Invalid environment: {s}"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

/// How much error information user-facing output includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDetail {
    /// Tag, message, and context
    Full,
    /// Tag and message only
    Message,
}

/// Per-profile defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentDefaults {
    /// Handler logger level; `None` silences handler logs
    pub log_level: Option<LogLevel>,
    pub verbose: bool,
    pub error_detail: ErrorDetail,
}

/// Resolve verbosity.
///
/// Precedence: `OUTFITTER_VERBOSE` > explicit `--verbose` > profile default.
pub fn resolve_verbose(flag: bool, env: &EnvSnapshot, profile: Environment) -> bool {
    if let Some(value) = env.get(ENV_VERBOSE).and_then(|v| parse_env_bool(v)) {
        return value;
    }
    if flag {
        return true;
    }
    profile.defaults().verbose
}

/// Location of the workspace config file, relative to the workspace root
pub const CONFIG_PATH: &str = ".outfitter/config.toml";

/// Default location of the committed surface snapshot
pub const DEFAULT_SURFACE_PATH: &str = ".outfitter/surface.json";

fn default_surface_path() -> PathBuf {
    PathBuf::from(DEFAULT_SURFACE_PATH)
}

/// `[surface]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSection {
    #[serde(default = "default_surface_path")]
    pub path: PathBuf,
}

impl Default for SurfaceSection {
    fn default() -> Self {
        Self {
            path: default_surface_path(),
        }
    }
}

/// `[mcp]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpSection {
    #[serde(default)]
    pub name: Option<String>,
}

/// Parsed `.outfitter/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutfitterConfig {
    #[serde(default)]
    pub surface: SurfaceSection,
    #[serde(default)]
    pub mcp: McpSection,
}

impl OutfitterConfig {
    /// Parse config TOML.
    ///
    /// # Example
    ///
    /// ```
    /// use outfitter_contracts::OutfitterConfig;
    ///
    /// let config = OutfitterConfig::parse("[surface]\npath = \"surface.json\"\n").unwrap();
    /// assert_eq!(config.surface.path.to_str(), Some("surface.json"));
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            OutfitterError::validation(format!("Invalid {CONFIG_PATH}: {}", e.message()))
        })
    }

    /// Load the config for the workspace rooted at `root`.
    ///
    /// A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_PATH);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No workspace config, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .or_internal(format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    /// Surface snapshot path resolved against `root`.
    pub fn surface_path(&self, root: &Path) -> PathBuf {
        root.join(&self.surface.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn environment_defaults_to_development() {
        assert_eq!(Environment::from_env(&env(&[])), Environment::Development);
        assert_eq!(
            Environment::from_env(&env(&[("OUTFITTER_ENV", "bogus")])),
            Environment::Development
        );
        assert_eq!(
            Environment::from_env(&env(&[("OUTFITTER_ENV", "production")])),
            Environment::Production
        );
    }

    #[test]
    fn verbose_env_beats_flag() {
        let e = env(&[("OUTFITTER_VERBOSE", "0")]);
        assert!(!resolve_verbose(true, &e, Environment::Development));

        let e = env(&[("OUTFITTER_VERBOSE", "1")]);
        assert!(resolve_verbose(false, &e, Environment::Production));
    }

    #[test]
    fn verbose_flag_beats_profile() {
        assert!(resolve_verbose(true, &env(&[]), Environment::Production));
        assert!(!resolve_verbose(false, &env(&[]), Environment::Production));
    }

    #[test]
    fn unparseable_verbose_env_falls_through() {
        let e = env(&[("OUTFITTER_VERBOSE", "maybe")]);
        assert!(resolve_verbose(true, &e, Environment::Test));
    }

    #[test]
    fn config_defaults_when_empty() {
        let config = OutfitterConfig::parse("").unwrap();
        assert_eq!(config.surface.path, PathBuf::from(DEFAULT_SURFACE_PATH));
        assert_eq!(config.mcp.name, None);
    }

    #[test]
    fn config_rejects_malformed_toml() {
        let err = OutfitterConfig::parse("[surface\npath = 1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn config_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = OutfitterConfig::load(dir.path()).unwrap();
        assert_eq!(config, OutfitterConfig::default());
    }

    #[test]
    fn config_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".outfitter")).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_PATH),
            "[surface]\npath = \"snap/surface.json\"\n\n[mcp]\nname = \"kit\"\n",
        )
        .unwrap();

        let config = OutfitterConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.surface_path(dir.path()),
            dir.path().join("snap/surface.json")
        );
        assert_eq!(config.mcp.name.as_deref(), Some("kit"));
    }
}
