//! Credential storage with optional keyring support
//!
//! Stored credential values are either plaintext or a `keyring:<key>`
//! reference into the OS keyring (with the `secure-storage` feature).
//! [`ProfileCredentials`] layers environment overrides on top and exposes a
//! profile to the credential resolver.

use super::config::Profile;
use super::error::{ConfigError, Result};
use crate::credential::{CredentialSource, ServiceAccount};
use std::env;

/// Prefix that indicates a value should be retrieved from the keyring
const KEYRING_PREFIX: &str = "keyring:";

/// Service name for keyring entries
#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "astractl";

/// Environment variable overriding the stored token
pub const TOKEN_ENV: &str = "ASTRACTL_TOKEN";
/// Environment variable overriding the service-account client name
pub const CLIENT_NAME_ENV: &str = "ASTRACTL_CLIENT_NAME";
/// Environment variable overriding the service-account client id
pub const CLIENT_ID_ENV: &str = "ASTRACTL_CLIENT_ID";
/// Environment variable overriding the service-account client secret
pub const CLIENT_SECRET_ENV: &str = "ASTRACTL_CLIENT_SECRET";

/// Storage backend for credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStorage {
    /// Store in OS keyring
    #[cfg(feature = "secure-storage")]
    Keyring,
    /// Store as plaintext
    Plaintext,
}

/// Reads and writes stored credential values
#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage: CredentialStorage,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Pick the keyring when the feature is enabled and a keyring answers
    pub fn new() -> Self {
        #[cfg(feature = "secure-storage")]
        {
            if keyring::Entry::new(SERVICE_NAME, "__probe__").is_ok() {
                return Self {
                    storage: CredentialStorage::Keyring,
                };
            }
        }
        Self::plaintext()
    }

    /// A store that never touches the keyring
    pub fn plaintext() -> Self {
        Self {
            storage: CredentialStorage::Plaintext,
        }
    }

    /// Store a value; returns what should be written to the config file
    pub fn store_credential(&self, key: &str, value: &str) -> Result<String> {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => {
                let entry = keyring::Entry::new(SERVICE_NAME, key)
                    .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
                entry.set_password(value).map_err(|e| {
                    ConfigError::KeyringError(format!(
                        "Failed to store '{}' in keyring: {}",
                        key, e
                    ))
                })?;
                Ok(format!("{}{}", KEYRING_PREFIX, key))
            }
            CredentialStorage::Plaintext => {
                let _ = key;
                Ok(value.to_string())
            }
        }
    }

    /// Resolve a stored value, following keyring references
    pub fn get_credential(&self, value: &str) -> Result<String> {
        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(value.to_string());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.get_password().map_err(|e| {
                ConfigError::KeyringError(format!(
                    "Failed to retrieve credential '{}' from keyring: {}",
                    key, e
                ))
            })
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(format!(
                "'{}' references the keyring but astractl was built without secure-storage",
                key
            )))
        }
    }

    /// Remove a keyring entry; plaintext values need no cleanup
    pub fn delete_credential(&self, value: &str) -> Result<()> {
        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(ConfigError::KeyringError(format!(
                    "Failed to delete credential from keyring: {}",
                    e
                ))),
            }
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            let _ = key;
            Ok(())
        }
    }

    /// Check if a value is a keyring reference
    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }

    pub fn storage_backend(&self) -> &'static str {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => "keyring",
            CredentialStorage::Plaintext => "plaintext",
        }
    }
}

/// A profile's credentials, with optional environment overrides
pub struct ProfileCredentials<'a> {
    profile: &'a Profile,
    store: CredentialStore,
    use_env_vars: bool,
}

impl<'a> ProfileCredentials<'a> {
    pub fn new(profile: &'a Profile, store: CredentialStore, use_env_vars: bool) -> Self {
        Self {
            profile,
            store,
            use_env_vars,
        }
    }

    fn resolve(&self, stored: Option<&str>, env_var: &str) -> Result<Option<String>> {
        if self.use_env_vars
            && let Ok(value) = env::var(env_var)
            && !value.is_empty()
        {
            return Ok(Some(value));
        }
        stored.map(|v| self.store.get_credential(v)).transpose()
    }
}

impl CredentialSource for ProfileCredentials<'_> {
    fn token(&self) -> crate::Result<Option<String>> {
        Ok(self.resolve(self.profile.token.as_deref(), TOKEN_ENV)?)
    }

    fn service_account(&self) -> crate::Result<Option<ServiceAccount>> {
        let stored = self.profile.service_account.as_ref();
        let name = self.resolve(stored.map(|s| s.client_name.as_str()), CLIENT_NAME_ENV)?;
        let id = self.resolve(stored.map(|s| s.client_id.as_str()), CLIENT_ID_ENV)?;
        let secret = self.resolve(stored.map(|s| s.client_secret.as_str()), CLIENT_SECRET_ENV)?;

        if name.is_none() && id.is_none() && secret.is_none() {
            return Ok(None);
        }
        Ok(Some(ServiceAccount::new(
            name.unwrap_or_default(),
            id.unwrap_or_default(),
            secret.unwrap_or_default(),
        )))
    }
}
