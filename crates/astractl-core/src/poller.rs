//! Bounded fixed-interval polling until a database reaches a target status
//!
//! Lifecycle operations that change state hand the database id to
//! [`wait_until`], which sleeps, re-fetches and evaluates the status up to a
//! fixed number of attempts. The loop ends in exactly one of three ways:
//!
//! - an awaited status is observed (or, for termination, the database is gone)
//! - the database reports `ERROR`, which is never waited past
//! - the attempt budget runs out, reported with the total N x I wait
//!
//! Failed lookups inside the loop are logged and retried on the next attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use astractl_core::{wait_until, Status, WaitPolicy, WaitTarget};
//!
//! let outcome = wait_until(
//!     &client,
//!     "abc123",
//!     &WaitTarget::status(Status::Parked),
//!     WaitPolicy::new(30, 30),
//!     None,
//! )
//! .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::model::{ManagedResource, Status};

/// How many times to poll, and how long to sleep before each poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval_secs: u64,
}

impl WaitPolicy {
    #[must_use]
    pub const fn new(attempts: u32, interval_secs: u64) -> Self {
        Self {
            attempts,
            interval_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Total sleep time when every attempt is used
    pub fn total_wait(&self) -> Duration {
        Duration::from_secs(self.interval_secs.saturating_mul(u64::from(self.attempts)))
    }
}

/// Poll policies for each waiting operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicies {
    #[serde(default = "WaitPolicies::default_create")]
    pub create: WaitPolicy,
    #[serde(default = "WaitPolicies::default_terminate")]
    pub terminate: WaitPolicy,
    #[serde(default = "WaitPolicies::default_park")]
    pub park: WaitPolicy,
    #[serde(default = "WaitPolicies::default_unpark")]
    pub unpark: WaitPolicy,
}

impl WaitPolicies {
    fn default_create() -> WaitPolicy {
        WaitPolicy::new(120, 30)
    }

    fn default_terminate() -> WaitPolicy {
        WaitPolicy::new(30, 10)
    }

    fn default_park() -> WaitPolicy {
        WaitPolicy::new(30, 30)
    }

    fn default_unpark() -> WaitPolicy {
        WaitPolicy::new(60, 30)
    }

    /// The same policy for every operation
    #[must_use]
    pub fn uniform(policy: WaitPolicy) -> Self {
        Self {
            create: policy,
            terminate: policy,
            park: policy,
            unpark: policy,
        }
    }
}

impl Default for WaitPolicies {
    fn default() -> Self {
        Self {
            create: Self::default_create(),
            terminate: Self::default_terminate(),
            park: Self::default_park(),
            unpark: Self::default_unpark(),
        }
    }
}

/// Progress events emitted while waiting
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Waiting has begun
    Started {
        id: String,
        awaiting: Vec<Status>,
        attempts: u32,
    },
    /// A poll saw an intermediate status
    Waiting {
        id: String,
        status: Status,
        attempt: u32,
        attempts: u32,
    },
    /// A poll failed and will be retried
    LookupFailed {
        id: String,
        error: String,
        attempt: u32,
        attempts: u32,
    },
    /// The wait succeeded; `status` is None when the database is gone
    Completed { id: String, status: Option<Status> },
    /// The wait failed
    Failed { id: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive its spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// The statuses that end a wait successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTarget {
    pub statuses: Vec<Status>,
    /// Treat a 401/404 lookup as success
    pub accept_gone: bool,
}

impl WaitTarget {
    pub fn status(status: Status) -> Self {
        Self::any_of([status])
    }

    pub fn any_of(statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            accept_gone: false,
        }
    }

    #[must_use]
    pub fn or_gone(mut self) -> Self {
        self.accept_gone = true;
        self
    }
}

/// How a successful wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Reached(ManagedResource),
    /// The database can no longer be looked up
    Gone,
}

impl WaitOutcome {
    pub fn into_resource(self) -> Option<ManagedResource> {
        match self {
            WaitOutcome::Reached(resource) => Some(resource),
            WaitOutcome::Gone => None,
        }
    }
}

/// Fetches a database by id
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn lookup(&self, id: &str) -> Result<ManagedResource>;
}

/// What one observed status means for the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Reached,
    ErrorStatus,
    Pending,
}

/// Judge a fetched status against the target; ERROR wins over everything
pub fn evaluate(target: &WaitTarget, status: Status) -> Step {
    if status == Status::Error {
        Step::ErrorStatus
    } else if target.statuses.contains(&status) {
        Step::Reached
    } else {
        Step::Pending
    }
}

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

/// Poll `id` until it reaches `target`, reports ERROR, or `policy` runs out
pub async fn wait_until<L>(
    lookup: &L,
    id: &str,
    target: &WaitTarget,
    policy: WaitPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<WaitOutcome>
where
    L: ResourceLookup + ?Sized,
{
    let attempts = policy.attempts;
    info!(
        id,
        awaiting = ?target.statuses,
        attempts,
        interval_secs = policy.interval_secs,
        "Waiting for database"
    );
    emit(
        on_progress,
        ProgressEvent::Started {
            id: id.to_string(),
            awaiting: target.statuses.clone(),
            attempts,
        },
    );

    for attempt in 1..=attempts {
        tokio::time::sleep(policy.interval()).await;

        let resource = match lookup.lookup(id).await {
            Ok(resource) => resource,
            Err(e) if target.accept_gone && e.is_resource_gone() => {
                info!(id, attempt, "Database no longer found, treating as complete");
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        id: id.to_string(),
                        status: None,
                    },
                );
                return Ok(WaitOutcome::Gone);
            }
            Err(e) => {
                warn!(id, attempt, attempts, error = %e, "Lookup failed, will retry");
                emit(
                    on_progress,
                    ProgressEvent::LookupFailed {
                        id: id.to_string(),
                        error: e.to_string(),
                        attempt,
                        attempts,
                    },
                );
                continue;
            }
        };

        let status = resource.status;
        match evaluate(target, status) {
            Step::Reached => {
                info!(id, %status, attempt, "Database reached awaited status");
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        id: id.to_string(),
                        status: Some(status),
                    },
                );
                return Ok(WaitOutcome::Reached(resource));
            }
            Step::ErrorStatus => {
                let err = CoreError::ResourceErrorStatus { id: id.to_string() };
                warn!(id, attempt, "Database entered ERROR status");
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        id: id.to_string(),
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }
            Step::Pending => {
                debug!(id, %status, attempt, attempts, "Database not ready yet");
                emit(
                    on_progress,
                    ProgressEvent::Waiting {
                        id: id.to_string(),
                        status,
                        attempt,
                        attempts,
                    },
                );
            }
        }
    }

    let err = CoreError::WaitTimeout {
        id: id.to_string(),
        awaited: target.statuses.clone(),
        elapsed: policy.total_wait(),
    };
    warn!(id, attempts, "Gave up waiting for database");
    emit(
        on_progress,
        ProgressEvent::Failed {
            id: id.to_string(),
            error: err.to_string(),
        },
    );
    Err(err)
}
