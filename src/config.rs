//! Tool configuration: where the registry lives and how `~` expands.
//!
//! Values come from the environment (`HOME`, optional `CND_HOME`) and may be
//! overridden by an optional TOML file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Directory under the user's home holding tool state.
pub const TOOL_DIR_NAME: &str = ".cnd";

/// Environment variable overriding the tool directory.
pub const CND_HOME_ENV: &str = "CND_HOME";

fn default_state_file() -> String {
    ".state".into()
}

fn default_namespace() -> String {
    "default".into()
}

/// Optional overrides read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Tool directory.
    pub cnd_home: Option<PathBuf>,
    /// State file name inside the tool directory.
    pub state_file: Option<String>,
    /// Home directory used for `~/` expansion.
    pub home_dir: Option<PathBuf>,
    /// Namespace used when none is given on the command line.
    pub default_namespace: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    /// User home directory, used for `~/` expansion in manifests.
    pub home_dir: PathBuf,
    /// Directory holding tool state.
    pub cnd_home: PathBuf,
    /// File name of the session registry inside `cnd_home`.
    pub state_file: String,
    /// Namespace used when the caller does not specify one.
    pub default_namespace: String,
}

impl GlobalConfig {
    /// Build the configuration for `home_dir` with default locations.
    #[must_use]
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        Self {
            cnd_home: home_dir.join(TOOL_DIR_NAME),
            home_dir,
            state_file: default_state_file(),
            default_namespace: default_namespace(),
        }
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no home directory can be determined.
    pub fn from_env() -> Result<Self> {
        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Config("HOME is not set".into()))?;

        let mut config = Self::with_home(PathBuf::from(home));
        if let Some(cnd_home) = env::var_os(CND_HOME_ENV).filter(|value| !value.is_empty()) {
            config.cnd_home = PathBuf::from(cnd_home);
        }
        Ok(config)
    }

    /// Resolve configuration from the environment, then apply the overrides
    /// in the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or parsed, or
    /// the result fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        let mut config = Self::from_env()?;
        config.apply_toml_str(&raw)?;
        Ok(config)
    }

    /// Apply overrides from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn apply_toml_str(&mut self, raw: &str) -> Result<()> {
        let overrides: ConfigOverrides = toml::from_str(raw)?;
        if let Some(home_dir) = overrides.home_dir {
            self.home_dir = home_dir;
        }
        if let Some(cnd_home) = overrides.cnd_home {
            self.cnd_home = cnd_home;
        }
        if let Some(state_file) = overrides.state_file {
            self.state_file = state_file;
        }
        if let Some(namespace) = overrides.default_namespace {
            self.default_namespace = namespace;
        }
        self.validate()
    }

    /// Full path of the session registry file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.cnd_home.join(&self.state_file)
    }

    fn validate(&self) -> Result<()> {
        if self.state_file.is_empty() || self.state_file.contains(['/', '\\']) {
            return Err(AppError::Config(
                "state_file must be a plain file name".into(),
            ));
        }
        if self.default_namespace.is_empty() {
            return Err(AppError::Config(
                "default_namespace must not be empty".into(),
            ));
        }
        Ok(())
    }
}
