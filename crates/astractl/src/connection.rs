//! Connection management for the control-plane client

use std::path::PathBuf;

use anyhow::Context;
use astractl_core::config::credential::{CLIENT_SECRET_ENV, TOKEN_ENV};
use astractl_core::{
    AuthenticatedClient, Config, CoreError, CredentialStore, Profile, ProfileCredentials,
    ProgressCallback, SessionSettings,
};
use tracing::{debug, info, trace};

use crate::error::{AstraCtlError, Result as CliResult};

/// Profile name reported when credentials come only from the environment
const ENV_PROFILE: &str = "environment";

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    #[allow(dead_code)]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Where this manager reads and writes its configuration
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            self.config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            self.config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Environment variables only apply when --config-file was not given
    pub fn use_env_vars(&self) -> bool {
        self.config_path.is_none()
    }

    /// The profile to connect with and its name
    ///
    /// With no profiles on disk, credentials exported in the environment are
    /// used against the production control plane.
    pub fn resolve_profile(&self, profile_name: Option<&str>) -> CliResult<(String, Profile)> {
        if profile_name.is_none()
            && self.config.profiles.is_empty()
            && self.use_env_vars()
            && env_has_credentials()
        {
            info!("No profiles configured, using credentials from environment variables");
            return Ok((ENV_PROFILE.to_string(), Profile::default()));
        }

        let name = self.config.resolve_profile(profile_name)?;
        let profile = self.config.profile(&name)?.clone();
        Ok((name, profile))
    }

    /// Build an authenticated client for the selected profile
    pub async fn create_client(
        &self,
        profile_name: Option<&str>,
        verbose: bool,
        progress: Option<ProgressCallback>,
    ) -> CliResult<AuthenticatedClient> {
        debug!("Creating control-plane client");
        trace!("Profile name: {:?}", profile_name);

        let use_env_vars = self.use_env_vars();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let (name, profile) = self.resolve_profile(profile_name)?;
        info!("Using profile: {} ({})", name, profile.environment);

        let source = ProfileCredentials::new(&profile, CredentialStore::new(), use_env_vars);
        let settings = SessionSettings {
            timeout: profile.timeout(),
            verbose,
        };

        let client = AuthenticatedClient::connect(profile.resolved_api_url(), &source, settings)
            .await
            .map_err(|e| match e.root() {
                CoreError::NoCredential => AstraCtlError::MissingCredentials {
                    name: name.clone(),
                },
                _ => AstraCtlError::from(e),
            })?
            .with_wait_policies(profile.wait_policies());

        debug!("Client ready for {}", profile.resolved_api_url());
        Ok(match progress {
            Some(callback) => client.with_progress(callback),
            None => client,
        })
    }
}

fn env_has_credentials() -> bool {
    [TOKEN_ENV, CLIENT_SECRET_ENV]
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
}
