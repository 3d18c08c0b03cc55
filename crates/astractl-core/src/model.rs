//! Control-plane data types
//!
//! Only the fields the lifecycle client reads or forwards are modelled
//! strictly. Everything else on a database document is optional so that new
//! server-side fields never break decoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Lifecycle status of a managed database, as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Provisioning,
    Active,
    Parking,
    Parked,
    Unparking,
    Resizing,
    Terminating,
    Terminated,
    Error,
    /// Any status outside the known set
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Provisioning => "PROVISIONING",
            Status::Active => "ACTIVE",
            Status::Parking => "PARKING",
            Status::Parked => "PARKED",
            Status::Unparking => "UNPARKING",
            Status::Resizing => "RESIZING",
            Status::Terminating => "TERMINATING",
            Status::Terminated => "TERMINATED",
            Status::Error => "ERROR",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields of a database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_keyspaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A managed database as returned by the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResource {
    pub id: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub info: ResourceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cqlsh_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql_url: Option<String>,
}

/// Parameters for creating a database
///
/// # Example
///
/// ```rust
/// use astractl_core::CreateResourceSpec;
///
/// let spec = CreateResourceSpec::new("mydb")
///     .with_keyspace("app")
///     .with_capacity_units(2);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    pub cloud_provider: String,
    pub tier: String,
    pub capacity_units: u32,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CreateResourceSpec {
    pub const DEFAULT_REGION: &'static str = "us-east1";
    pub const DEFAULT_TIER: &'static str = "serverless";
    pub const DEFAULT_CAPACITY_UNITS: u32 = 1;
    pub const DEFAULT_CLOUD_PROVIDER: &'static str = "GCP";

    /// A serverless GCP database in us-east1 with one capacity unit
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyspace: None,
            cloud_provider: Self::DEFAULT_CLOUD_PROVIDER.to_string(),
            tier: Self::DEFAULT_TIER.to_string(),
            capacity_units: Self::DEFAULT_CAPACITY_UNITS,
            region: Self::DEFAULT_REGION.to_string(),
            user: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    #[must_use]
    pub fn with_capacity_units(mut self, capacity_units: u32) -> Self {
        self.capacity_units = capacity_units;
        self
    }

    #[must_use]
    pub fn with_cloud_provider(mut self, cloud_provider: impl Into<String>) -> Self {
        self.cloud_provider = cloud_provider.into();
        self
    }

    /// Set the initial database user and password
    #[must_use]
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("database name is required".to_string()));
        }
        if self.capacity_units == 0 {
            return Err(CoreError::Validation(
                "capacity units must be at least 1".to_string(),
            ));
        }
        for (field, value) in [
            ("region", &self.region),
            ("tier", &self.tier),
            ("cloud provider", &self.cloud_provider),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CreateResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateResourceSpec")
            .field("name", &self.name)
            .field("keyspace", &self.keyspace)
            .field("cloud_provider", &self.cloud_provider)
            .field("tier", &self.tier)
            .field("capacity_units", &self.capacity_units)
            .field("region", &self.region)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Filters for listing databases; empty fields are not sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub include: Option<String>,
    pub provider: Option<String>,
    pub starting_after: Option<String>,
    pub limit: u32,
}

impl ListFilter {
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Query parameters for the non-empty filters
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in [
            ("include", &self.include),
            ("provider", &self.provider),
            ("starting_after", &self.starting_after),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
        if self.limit > 0 {
            pairs.push(("limit".to_string(), self.limit.to_string()));
        }
        pairs
    }
}

/// Body of a resize request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityChange {
    pub capacity_units: u32,
}

/// Body of a password reset request
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Pricing for a tier, in cents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCost {
    #[serde(default)]
    pub cost_per_min_cents: f64,
    #[serde(default)]
    pub cost_per_hour_cents: f64,
    #[serde(default)]
    pub cost_per_day_cents: f64,
    #[serde(default)]
    pub cost_per_month_cents: f64,
}

fn cents_to_dollars(cents: f64) -> f64 {
    if cents > 0.0 { cents / 100.0 } else { 0.0 }
}

impl TierCost {
    pub fn per_month_dollars(&self) -> f64 {
        cents_to_dollars(self.cost_per_month_cents)
    }

    pub fn per_minute_dollars(&self) -> f64 {
        cents_to_dollars(self.cost_per_min_cents)
    }
}

/// A tier/region combination available to the organization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInfo {
    #[serde(default)]
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cloud_provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_continent: Option<String>,
    #[serde(default)]
    pub cost: TierCost,
    #[serde(default)]
    pub database_count_used: u32,
    #[serde(default)]
    pub database_count_limit: u32,
    #[serde(default)]
    pub capacity_units_used: u32,
    #[serde(default)]
    pub capacity_units_limit: u32,
}

/// Pre-signed download URLs for a database's secure connect bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUrls {
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(rename = "downloadURLInternal", default)]
    pub download_url_internal: String,
    #[serde(rename = "downloadURLMigrationProxy", default)]
    pub download_url_migration_proxy: String,
    #[serde(rename = "downloadURLMigrationProxyInternal", default)]
    pub download_url_migration_proxy_internal: String,
}

/// Which bundle variant to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BundleKind {
    #[default]
    External,
    Internal,
    ProxyExternal,
    ProxyInternal,
}

impl BundleUrls {
    /// The URL for `kind`, or None when the control plane left it empty
    pub fn url_for(&self, kind: BundleKind) -> Option<&str> {
        let url = match kind {
            BundleKind::External => &self.download_url,
            BundleKind::Internal => &self.download_url_internal,
            BundleKind::ProxyExternal => &self.download_url_migration_proxy,
            BundleKind::ProxyInternal => &self.download_url_migration_proxy_internal,
        };
        Some(url.as_str()).filter(|u| !u.is_empty())
    }
}
