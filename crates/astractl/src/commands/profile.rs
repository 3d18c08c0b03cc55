//! Profile management command implementations

use astractl_core::{CredentialStore, Profile};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{AstraCtlError, Result as CliResult};
use crate::output::{self, print_output, print_rows};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    match profile_cmd {
        ProfileCommands::List => handle_list(conn_mgr, output_format),
        ProfileCommands::Path => handle_path(conn_mgr, output_format),
        ProfileCommands::Show { name } => handle_show(conn_mgr, name, output_format),
        ProfileCommands::Remove { name } => handle_remove(conn_mgr, name),
        ProfileCommands::Default { name } => handle_default(conn_mgr, name),
    }
}

/// One profile with its secrets masked
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub name: String,
    pub environment: String,
    pub api_url: String,
    pub credentials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub timeout_secs: u64,
    pub is_default: bool,
}

impl ProfileSummary {
    pub fn new(name: &str, profile: &Profile, is_default: bool) -> Self {
        let account = profile.service_account.as_ref();
        Self {
            name: name.to_string(),
            environment: profile.environment.to_string(),
            api_url: profile.resolved_api_url().to_string(),
            credentials: profile.credential_kind().to_string(),
            token: profile.token.as_deref().map(mask),
            client_name: account.map(|a| a.client_name.clone()),
            client_id: account.map(|a| a.client_id.clone()),
            client_secret: account.map(|a| mask(&a.client_secret)),
            timeout_secs: profile.timeout().as_secs(),
            is_default,
        }
    }
}

/// Keyring references are shown as-is; other secrets keep only a short prefix
pub fn mask(secret: &str) -> String {
    if CredentialStore::is_keyring_reference(secret) {
        return secret.to_string();
    }
    if secret.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

fn summaries(conn_mgr: &ConnectionManager) -> Vec<ProfileSummary> {
    let default = conn_mgr.config.default_profile.as_deref();
    conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .map(|(name, profile)| ProfileSummary::new(name, profile, default == Some(name.as_str())))
        .collect()
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles = summaries(conn_mgr);

    match output::OutputFormat::resolve(output_format, true) {
        output::OutputFormat::Table => {
            if profiles.is_empty() {
                println!("No profiles configured.");
                println!("Run 'astractl login' to create one.");
                return Ok(());
            }
            let rows = profiles
                .iter()
                .map(|p| {
                    vec![
                        if p.is_default {
                            format!("{} {}", p.name, "*".green())
                        } else {
                            p.name.clone()
                        },
                        p.environment.clone(),
                        p.credentials.clone(),
                        p.api_url.clone(),
                    ]
                })
                .collect();
            print_rows(&["name", "environment", "credentials", "api url"], rows);
        }
        fmt => print_output(&profiles, fmt)?,
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = conn_mgr.config_file()?;
    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(
            serde_json::json!({ "path": path.display().to_string() }),
            output::OutputFormat::resolve(output_format, false),
        )?,
        OutputFormat::Auto | OutputFormat::Table => println!("{}", path.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    let summary = ProfileSummary::new(name, profile, is_default);

    match output_format {
        OutputFormat::Auto | OutputFormat::Table => {
            println!("Profile: {}", summary.name.bold());
            println!("  Environment: {}", summary.environment);
            println!("  API URL: {}", summary.api_url);
            println!("  Credentials: {}", summary.credentials);
            if let Some(token) = &summary.token {
                println!("  Token: {}", token);
            }
            if let Some(client_name) = &summary.client_name {
                println!("  Client name: {}", client_name);
            }
            if let Some(client_id) = &summary.client_id {
                println!("  Client id: {}", client_id);
            }
            if let Some(secret) = &summary.client_secret {
                println!("  Client secret: {}", secret);
            }
            println!("  Request timeout: {}s", summary.timeout_secs);
            if is_default {
                println!("  Default: {}", "yes".green());
            }
        }
        fmt => print_output(&summary, output::OutputFormat::resolve(fmt, false))?,
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    let removed = config
        .remove_profile(name)
        .ok_or_else(|| AstraCtlError::ProfileNotFound {
            name: name.to_string(),
        })?;

    let store = CredentialStore::new();
    let secrets = removed
        .token
        .iter()
        .chain(removed.service_account.iter().map(|a| &a.client_secret));
    for secret in secrets {
        if let Err(e) = store.delete_credential(secret) {
            debug!("Could not delete stored credential: {}", e);
        }
    }

    ConnectionManager::with_config_path(config, conn_mgr.config_path.clone()).save_config()?;
    info!("Removed profile '{}'", name);
    println!("Profile '{}' removed", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    config.profile(name)?;
    config.default_profile = Some(name.to_string());

    ConnectionManager::with_config_path(config, conn_mgr.config_path.clone()).save_config()?;
    println!("Default profile set to '{}'", name);
    Ok(())
}
