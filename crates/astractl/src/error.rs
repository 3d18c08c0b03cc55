//! Error types for astractl
//!
//! Every failure reaching `main` is one of these, printed as a single
//! diagnostic with tips before exiting with status 1.

use astractl_core::{ConfigError, CoreError};
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Profile 'staging' not found
///
///   tip: List available profiles: astractl profile list
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    pub fn tip(mut self, text: &str) -> Self {
        self.tips.push(text.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the astractl application
#[derive(Error, Debug)]
pub enum AstraCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Run 'astractl login' to create one.")]
    NoProfileConfigured,

    #[error("Missing credentials for profile '{name}'")]
    MissingCredentials { name: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("{message}")]
    ApiError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Database entered ERROR status: {message}")]
    ResourceFailed { message: String },

    #[error("File error for '{path}': {message}")]
    FileError { path: String, message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for astractl operations
pub type Result<T> = std::result::Result<T, AstraCtlError>;

impl AstraCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            AstraCtlError::ProfileNotFound { name } => vec![
                "List available profiles: astractl profile list".to_string(),
                format!("Create profile '{}': astractl --profile {} login", name, name),
            ],
            AstraCtlError::NoProfileConfigured => vec![
                "Store a token: astractl login --token <token>".to_string(),
                "Or set ASTRACTL_TOKEN in the environment".to_string(),
            ],
            AstraCtlError::MissingCredentials { name } => vec![
                format!("Store credentials: astractl --profile {} login", name),
                format!("Check profile details: astractl profile show {}", name),
            ],
            AstraCtlError::AuthenticationFailed { .. } => vec![
                "Check your credentials: astractl profile show <profile>".to_string(),
                "Tokens and service accounts are environment specific; check --environment"
                    .to_string(),
            ],
            AstraCtlError::NotFound { .. } => vec![
                "Verify the database id: astractl db list".to_string(),
                "Check that you're using the correct profile".to_string(),
            ],
            AstraCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the API URL: astractl profile show <profile>".to_string(),
            ],
            AstraCtlError::Timeout { .. } => vec![
                "The operation may still complete; check with: astractl db get <id>".to_string(),
                "Raise the poll limits in the profile's [wait] table".to_string(),
            ],
            AstraCtlError::InvalidInput { .. } => {
                vec!["Check the command syntax: astractl <command> --help".to_string()]
            }
            AstraCtlError::FileError { path, .. } => vec![
                format!("Check that the directory for {} exists and is writable", path),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}

impl From<CoreError> for AstraCtlError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err.root() {
            CoreError::Validation(_) => AstraCtlError::InvalidInput { message },
            CoreError::Config(config_err) => config_error(config_err, message),
            CoreError::NoCredential => AstraCtlError::MissingCredentials {
                name: "default".to_string(),
            },
            CoreError::Authentication(_) => AstraCtlError::AuthenticationFailed { message },
            CoreError::ResourceErrorStatus { .. } => AstraCtlError::ResourceFailed { message },
            CoreError::WaitTimeout { .. } => AstraCtlError::Timeout { message },
            CoreError::Transport(e) if e.is_timeout() => AstraCtlError::Timeout { message },
            CoreError::Transport(_) => AstraCtlError::ConnectionError { message },
            _ if err.is_unauthorized() => AstraCtlError::AuthenticationFailed { message },
            _ if err.is_not_found() => AstraCtlError::NotFound { message },
            _ => AstraCtlError::ApiError { message },
        }
    }
}

fn config_error(err: &ConfigError, message: String) -> AstraCtlError {
    match err {
        ConfigError::ProfileNotFound { name } => {
            AstraCtlError::ProfileNotFound { name: name.clone() }
        }
        ConfigError::NoProfiles { .. } => AstraCtlError::NoProfileConfigured,
        _ => AstraCtlError::Configuration(message),
    }
}

impl From<ConfigError> for AstraCtlError {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        config_error(&err, message)
    }
}

impl From<serde_json::Error> for AstraCtlError {
    fn from(err: serde_json::Error) -> Self {
        AstraCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for AstraCtlError {
    fn from(err: std::io::Error) -> Self {
        AstraCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for AstraCtlError {
    fn from(err: anyhow::Error) -> Self {
        AstraCtlError::Configuration(format!("{:#}", err))
    }
}
