//! `astractl login`: store credentials on a profile

use astractl_core::{Config, CredentialStore, Profile, ServiceAccount, ServiceAccountConfig};
use tracing::{debug, info};

use crate::cli::LoginArgs;
use crate::connection::ConnectionManager;
use crate::error::{AstraCtlError, Result as CliResult};

/// Profile created by `login` when none is named or configured
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Credentials given on the command line
#[derive(Clone, PartialEq, Eq)]
pub enum LoginCredential {
    Token(String),
    ServiceAccount(ServiceAccount),
}

impl std::fmt::Debug for LoginCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginCredential::Token(_) => f.write_str("Token(***)"),
            LoginCredential::ServiceAccount(account) => {
                f.debug_tuple("ServiceAccount").field(account).finish()
            }
        }
    }
}

pub async fn handle_login(
    args: &LoginArgs,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
) -> CliResult<()> {
    let credential = credential_from_args(args)?;

    let mut config = conn_mgr.config.clone();
    let name = profile_name
        .map(str::to_string)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string());

    #[cfg(feature = "secure-storage")]
    let store = if args.use_keyring {
        CredentialStore::new()
    } else {
        CredentialStore::plaintext()
    };
    #[cfg(not(feature = "secure-storage"))]
    let store = CredentialStore::plaintext();

    apply_login(&mut config, &name, credential, args, &store)?;

    let updated = ConnectionManager::with_config_path(config, conn_mgr.config_path.clone());
    updated.save_config()?;

    info!("Stored credentials on profile '{}'", name);
    println!("Login information saved to profile '{}'", name);
    Ok(())
}

/// Pick and validate the credential the flags describe
pub fn credential_from_args(args: &LoginArgs) -> CliResult<LoginCredential> {
    if let Some(token) = &args.token {
        if token.trim().is_empty() {
            return Err(AstraCtlError::InvalidInput {
                message: "token must not be empty".to_string(),
            });
        }
        return Ok(LoginCredential::Token(token.trim().to_string()));
    }

    let account = if let Some(json) = &args.json {
        serde_json::from_str::<ServiceAccount>(json).map_err(|e| AstraCtlError::InvalidInput {
            message: format!("unable to parse the service account JSON: {}", e),
        })?
    } else if args.client_name.is_some() || args.client_id.is_some() || args.client_secret.is_some()
    {
        ServiceAccount::new(
            args.client_name.clone().unwrap_or_default(),
            args.client_id.clone().unwrap_or_default(),
            args.client_secret.clone().unwrap_or_default(),
        )
    } else {
        return Err(AstraCtlError::InvalidInput {
            message: "provide --token, --json or --client-name/--client-id/--client-secret"
                .to_string(),
        });
    };

    account.validate()?;
    Ok(LoginCredential::ServiceAccount(account))
}

/// Write `credential` onto profile `name`, creating it when missing
pub fn apply_login(
    config: &mut Config,
    name: &str,
    credential: LoginCredential,
    args: &LoginArgs,
    store: &CredentialStore,
) -> CliResult<()> {
    let mut profile: Profile = config.profiles.get(name).cloned().unwrap_or_default();

    if let Some(environment) = args.environment {
        profile.environment = environment;
    }
    if let Some(api_url) = &args.api_url {
        profile.api_url = Some(api_url.clone());
    }

    match credential {
        LoginCredential::Token(token) => {
            let stored = store.store_credential(&format!("{}-token", name), &token)?;
            profile.token = Some(stored);
            profile.service_account = None;
        }
        LoginCredential::ServiceAccount(account) => {
            let secret =
                store.store_credential(&format!("{}-client-secret", name), &account.client_secret)?;
            profile.service_account = Some(ServiceAccountConfig {
                client_secret: secret,
                ..ServiceAccountConfig::from(account)
            });
            profile.token = None;
        }
    }
    debug!(
        "Profile '{}' now uses {} credentials via {} storage",
        name,
        profile.credential_kind(),
        store.storage_backend()
    );

    config.set_profile(name.to_string(), profile);
    if config.default_profile.is_none() {
        config.default_profile = Some(name.to_string());
    }
    Ok(())
}
