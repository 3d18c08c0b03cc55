//! Configuration management for astractl
//!
//! Configuration is stored in TOML format with support for multiple named
//! profiles. Each profile picks a control-plane environment and holds either a
//! bearer token or a service account.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::credential::ServiceAccount;
use crate::poller::WaitPolicies;
use crate::transport::DEFAULT_TIMEOUT;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Profile {
    /// Control-plane environment
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's API URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Bearer token; supports `keyring:` references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Service account exchanged for a token when no token is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountConfig>,
    /// Per-request deadline in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Poll policy overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitPolicies>,
}

/// Stored service account; each value supports `keyring:` references
#[derive(Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ServiceAccountConfig {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl fmt::Debug for ServiceAccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountConfig")
            .field("client_name", &self.client_name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl From<ServiceAccount> for ServiceAccountConfig {
    fn from(account: ServiceAccount) -> Self {
        Self {
            client_name: account.client_name,
            client_id: account.client_id,
            client_secret: account.client_secret,
        }
    }
}

/// Control-plane environments
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Test,
    Dev,
}

impl Environment {
    pub fn api_url(&self) -> &'static str {
        match self {
            Environment::Prod => "https://api.astra.datastax.com",
            Environment::Test => "https://api.test.cloud.datastax.com",
            Environment::Dev => "https://api.dev.cloud.datastax.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Prod => write!(f, "prod"),
            Environment::Test => write!(f, "test"),
            Environment::Dev => write!(f, "dev"),
        }
    }
}

impl Profile {
    /// The API URL to use: the override, else the environment's
    pub fn resolved_api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.environment.api_url())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn wait_policies(&self) -> WaitPolicies {
        self.wait.unwrap_or_default()
    }

    /// Short description of the stored credential kind
    pub fn credential_kind(&self) -> &'static str {
        match (&self.token, &self.service_account) {
            (Some(_), _) => "token",
            (None, Some(_)) => "service account",
            (None, None) => "none",
        }
    }
}

impl Config {
    /// Resolve the profile to use: explicit, then default, then first by name
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            return Ok(name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: "Run 'astractl login' to create one.".to_string(),
            })
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS the Linux-style `~/.config/astractl/config.toml` is preferred
    /// when it (or its directory) exists.
    ///
    /// On Linux: ~/.config/astractl/config.toml
    /// On Windows: %APPDATA%\astractl\astractl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("astractl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path.parent().is_some_and(|p| p.exists())
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "astractl", "astractl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}`; unset variables stay as written
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok()).to_string()
    }
}
