//! Credential resolution and service-account exchange
//!
//! A stored bearer token always wins. Without one, a complete service account
//! is exchanged for a short-lived token with a single call; with neither the
//! caller is told to log in. The result is an [`AuthenticatedSession`] that
//! every lifecycle operation borrows read-only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::classify::{ExpectedStatus, classify};
use crate::error::{CoreError, Operation, Result};
use crate::transport::{ApiRequest, DEFAULT_TIMEOUT, Transport};

/// A service-account descriptor, exchanged for a bearer token
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl ServiceAccount {
    pub fn new(
        client_name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Fails naming the first empty field
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("clientName", &self.client_name),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{} missing", field)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_name", &self.client_name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// The credential chosen for this invocation
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Token(String),
    ServiceAccount(ServiceAccount),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token(_) => f.write_str("Token(***)"),
            Credential::ServiceAccount(sa) => f.debug_tuple("ServiceAccount").field(sa).finish(),
        }
    }
}

/// Somewhere credentials can be read from
pub trait CredentialSource {
    /// The stored bearer token, if any
    fn token(&self) -> Result<Option<String>>;

    /// The stored service account, if any
    fn service_account(&self) -> Result<Option<ServiceAccount>>;
}

/// Pick the credential to use: a non-empty token first, then a service account
pub fn resolve_credential(source: &dyn CredentialSource) -> Result<Credential> {
    if let Some(token) = source.token()?.filter(|t| !t.trim().is_empty()) {
        debug!("Using stored bearer token");
        return Ok(Credential::Token(token));
    }

    match source.service_account()? {
        Some(account) => {
            account.validate()?;
            debug!(client_name = %account.client_name, "Using stored service account");
            Ok(Credential::ServiceAccount(account))
        }
        None => Err(CoreError::NoCredential),
    }
}

/// Exchanges a service account for a bearer token
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, account: &ServiceAccount) -> Result<String>;
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

#[async_trait]
impl TokenExchange for Transport {
    async fn exchange(&self, account: &ServiceAccount) -> Result<String> {
        let request = ApiRequest::post(["v2", "authenticateServiceAccount"]).json(account)?;
        let response = self.execute(request).await?;

        classify(&response, ExpectedStatus::OK)
            .map_err(|e| CoreError::Authentication(e.to_string()))?;

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| CoreError::Authentication(e.to_string()))?;
        if parsed.token.is_empty() {
            return Err(CoreError::Authentication(
                "empty token in token response".to_string(),
            ));
        }
        info!(client_name = %account.client_name, "Exchanged service account for token");
        Ok(parsed.token)
    }
}

/// Per-invocation settings carried by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub timeout: Duration,
    pub verbose: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }
}

/// A resolved bearer token plus request settings; immutable once built
#[derive(Clone)]
pub struct AuthenticatedSession {
    token: String,
    timeout: Duration,
    verbose: bool,
}

impl AuthenticatedSession {
    pub fn new(token: impl Into<String>, settings: SessionSettings) -> Self {
        Self {
            token: token.into(),
            timeout: settings.timeout,
            verbose: settings.verbose,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

impl fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Resolve a credential and turn it into a session.
///
/// A token never touches the network. A service account costs exactly one
/// exchange call.
pub async fn authenticate(
    source: &dyn CredentialSource,
    exchanger: &dyn TokenExchange,
    settings: SessionSettings,
) -> Result<AuthenticatedSession> {
    let token = match resolve_credential(source)? {
        Credential::Token(token) => token,
        Credential::ServiceAccount(account) => exchanger
            .exchange(&account)
            .await
            .map_err(|e| e.during(Operation::Authenticate, None))?,
    };
    Ok(AuthenticatedSession::new(token, settings))
}
