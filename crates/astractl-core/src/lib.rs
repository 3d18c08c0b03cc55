//! # astractl-core
//!
//! The managed-database lifecycle client behind the `astractl` CLI.
//!
//! The pieces, leaf first:
//!
//! - [`credential`] picks a stored token or exchanges a service account for one
//! - [`transport`] executes single requests with a bounded deadline
//! - [`classify`] turns rejected responses into structured [`ApiError`]s
//! - [`client`] issues one lifecycle operation per call behind [`ControlPlane`]
//! - [`poller`] waits for a database to reach a status with [`wait_until`]
//! - [`config`] stores profiles and credentials on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use astractl_core::{
//!     AuthenticatedClient, Config, ControlPlane, CreateResourceSpec, CredentialStore,
//!     ProfileCredentials, SessionSettings,
//! };
//!
//! let config = Config::load()?;
//! let name = config.resolve_profile(None)?;
//! let profile = config.profile(&name)?;
//! let source = ProfileCredentials::new(profile, CredentialStore::new(), true);
//!
//! let client = AuthenticatedClient::connect(
//!     profile.resolved_api_url(),
//!     &source,
//!     SessionSettings { timeout: profile.timeout(), verbose: false },
//! )
//! .await?
//! .with_wait_policies(profile.wait_policies());
//!
//! let db = client.create(&CreateResourceSpec::new("mydb").with_keyspace("app")).await?;
//! println!("{} is {}", db.id, db.status);
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod poller;
pub mod transport;

pub use classify::{ApiError, ApiErrorEntry, ErrorDetail, ExpectedStatus, classify};
pub use client::{AuthenticatedClient, ControlPlane, id_from_location};
pub use config::{
    Config, ConfigError, CredentialStore, Environment, Profile, ProfileCredentials,
    ServiceAccountConfig,
};
pub use credential::{
    AuthenticatedSession, Credential, CredentialSource, ServiceAccount, SessionSettings,
    TokenExchange, authenticate, resolve_credential,
};
pub use error::{CoreError, Operation, Result};
pub use model::{
    BundleKind, BundleUrls, CreateResourceSpec, ListFilter, ManagedResource, ResourceInfo, Status,
    TierCost, TierInfo,
};
pub use poller::{
    ProgressCallback, ProgressEvent, ResourceLookup, WaitOutcome, WaitPolicies, WaitPolicy,
    WaitTarget, wait_until,
};
pub use transport::{ApiRequest, RawResponse, Transport};
