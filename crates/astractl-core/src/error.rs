//! Unified error handling for astractl-core
//!
//! Every failure the lifecycle client can produce is one [`CoreError`]. Layers
//! add context by wrapping an inner error in [`CoreError::Operation`], and the
//! helper predicates look through that wrapper so callers can ask "was this a
//! 404?" without unpacking the chain.
//!
//! # Example
//!
//! ```rust
//! use astractl_core::{CoreError, Operation};
//!
//! let err = CoreError::Validation("capacity units must be at least 1".to_string())
//!     .during(Operation::Resize, Some("db-1"));
//! assert!(err.is_validation());
//! assert!(!err.is_retryable());
//! assert!(err.to_string().contains("db-1"));
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::classify::ApiError;
use crate::config::ConfigError;
use crate::model::Status;

/// Core error type for credential resolution, transport, and lifecycle operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or incomplete caller input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Neither a token nor a service account is configured
    #[error(
        "No credential configured. Run 'astractl login' to store a token or a service account."
    )]
    NoCredential,

    /// Service-account exchange failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// DNS, connect, TLS or deadline failure on a single request
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The control plane answered with a status the operation does not accept
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The resource reported ERROR while being waited on
    #[error("resource {id} entered ERROR status")]
    ResourceErrorStatus { id: String },

    /// Poll attempts exhausted before an awaited status was observed
    #[error(
        "resource {id} did not reach status {} after {} seconds",
        join_statuses(.awaited),
        .elapsed.as_secs()
    )]
    WaitTimeout {
        id: String,
        awaited: Vec<Status>,
        elapsed: Duration,
    },

    /// A success response that is missing something the client needs
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Configuration or credential store failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An inner error annotated with the operation and resource it happened on
    #[error("{operation} failed{}: {source}", describe_target(.id))]
    Operation {
        operation: Operation,
        id: Option<String>,
        #[source]
        source: Box<CoreError>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// The control-plane operation an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authenticate,
    Create,
    Terminate,
    Park,
    Unpark,
    Resize,
    Find,
    List,
    ListTiers,
    FetchBundle,
    AddKeyspace,
    ResetPassword,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Authenticate => "authenticate",
            Operation::Create => "create database",
            Operation::Terminate => "terminate database",
            Operation::Park => "park database",
            Operation::Unpark => "unpark database",
            Operation::Resize => "resize database",
            Operation::Find => "find database",
            Operation::List => "list databases",
            Operation::ListTiers => "list tiers",
            Operation::FetchBundle => "fetch secure bundle",
            Operation::AddKeyspace => "add keyspace",
            Operation::ResetPassword => "reset password",
        };
        f.write_str(name)
    }
}

fn join_statuses(statuses: &[Status]) -> String {
    statuses
        .iter()
        .map(Status::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn describe_target(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" for {}", id),
        None => String::new(),
    }
}

impl CoreError {
    /// Wrap this error with the operation (and resource id) it happened in
    #[must_use]
    pub fn during(self, operation: Operation, id: Option<&str>) -> Self {
        CoreError::Operation {
            operation,
            id: id.map(str::to_string),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any operation context
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The decoded API error, if this chain ends in one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.root() {
            CoreError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of the underlying API or transport error
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            CoreError::Api(e) => Some(e.status),
            CoreError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
            || matches!(
                self.root(),
                CoreError::Authentication(_) | CoreError::NoCredential
            )
    }

    /// Returns true if the lookup says the resource no longer exists.
    ///
    /// 401 counts as gone: the control plane answers 401 for a database id
    /// that has been removed from the organization.
    #[must_use]
    pub fn is_resource_gone(&self) -> bool {
        matches!(self.api_error().map(|e| e.status), Some(401) | Some(404))
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns true if this is a timeout, either per-request or while waiting
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self.root() {
            CoreError::Transport(e) => e.is_timeout(),
            CoreError::WaitTimeout { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this is a rate limiting error (429)
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }

    /// Returns true if this is a conflict error (409)
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Returns true for caller-input errors
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), CoreError::Validation(_))
    }

    /// Returns true if this error is potentially retryable by the operator
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            CoreError::Transport(e) => e.is_timeout() || e.is_connect(),
            CoreError::WaitTimeout { .. } => true,
            CoreError::Api(e) => e.status == 429 || (500..600).contains(&e.status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ErrorDetail, ExpectedStatus};

    fn api(status: u16) -> CoreError {
        CoreError::Api(ApiError {
            status,
            expected: ExpectedStatus::Exactly(200),
            detail: ErrorDetail::Reported(vec![]),
        })
    }

    #[test]
    fn test_operation_context_is_transparent_to_helpers() {
        let err = api(404).during(Operation::Find, Some("abc"));
        assert!(err.is_not_found());
        assert!(err.is_resource_gone());
        assert!(!err.is_unauthorized());
        assert!(err.api_error().is_some());
    }

    #[test]
    fn test_unauthorized_counts_as_gone() {
        let err = api(401);
        assert!(err.is_unauthorized());
        assert!(err.is_resource_gone());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(api(503).is_server_error());
        assert!(api(503).is_retryable());
        assert!(api(429).is_rate_limited());
        assert!(api(429).is_retryable());
        assert!(!api(409).is_retryable());
        assert!(api(409).is_conflict());
    }

    #[test]
    fn test_wait_timeout_display() {
        let err = CoreError::WaitTimeout {
            id: "abc".to_string(),
            awaited: vec![Status::Terminated, Status::Terminating],
            elapsed: Duration::from_secs(300),
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "resource abc did not reach status TERMINATED or TERMINATING after 300 seconds"
        );
    }

    #[test]
    fn test_operation_display_includes_target() {
        let err = CoreError::ResourceErrorStatus {
            id: "abc".to_string(),
        }
        .during(Operation::Create, Some("abc"));
        assert_eq!(
            err.to_string(),
            "create database failed for abc: resource abc entered ERROR status"
        );

        let err = CoreError::UnexpectedResponse("empty".to_string()).during(Operation::List, None);
        assert_eq!(
            err.to_string(),
            "list databases failed: Unexpected response: empty"
        );
    }

    #[test]
    fn test_validation_not_retryable() {
        let err = CoreError::Validation("clientId missing".to_string());
        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_no_credential_is_unauthorized() {
        let err = CoreError::NoCredential;
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("astractl login"));
    }
}
