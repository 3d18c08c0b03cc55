//! Configuration and profile management for astractl
//!
//! # Features
//!
//! - Multiple named profiles, each bound to a control-plane environment
//! - Token or service-account credentials, optionally kept in the OS keyring
//! - Environment variable expansion in config files and credential overrides
//! - Platform-specific config file locations

#![allow(clippy::module_inception)]

pub mod config;
pub mod credential;
pub mod error;

pub use config::{Config, Environment, Profile, ServiceAccountConfig};
pub use credential::{CredentialStorage, CredentialStore, ProfileCredentials};
pub use error::{ConfigError, Result};
