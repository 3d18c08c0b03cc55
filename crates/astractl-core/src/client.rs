//! Lifecycle operations against the control plane
//!
//! [`ControlPlane`] is the one interface the CLI programs against and
//! [`AuthenticatedClient`] its one implementation. Each operation issues a
//! single request, checks it against the status that operation accepts, and
//! for create/terminate/park/unpark hands the id to the poller.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

use crate::classify::{ExpectedStatus, classify};
use crate::credential::{
    AuthenticatedSession, CredentialSource, SessionSettings, TokenExchange, authenticate,
};
use crate::error::{CoreError, Operation, Result};
use crate::model::{
    BundleKind, BundleUrls, CapacityChange, CreateResourceSpec, ListFilter, ManagedResource,
    PasswordReset, Status, TierInfo,
};
use crate::poller::{
    ProgressCallback, ResourceLookup, WaitOutcome, WaitPolicies, WaitPolicy, WaitTarget, wait_until,
};
use crate::transport::{ApiRequest, RawResponse, Transport};

const DATABASES: [&str; 2] = ["v2", "databases"];

/// Every lifecycle operation the CLI can issue
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a database and wait until it is ACTIVE
    async fn create(&self, spec: &CreateResourceSpec) -> Result<ManagedResource>;

    /// Terminate a database and wait until it is terminating, terminated or gone
    async fn terminate(&self, id: &str, prepared_state_only: bool) -> Result<()>;

    /// Park a database and wait until it is PARKED
    async fn park(&self, id: &str) -> Result<()>;

    /// Unpark a database and wait until it is ACTIVE
    async fn unpark(&self, id: &str) -> Result<()>;

    /// Submit a capacity change; returns once accepted
    async fn resize(&self, id: &str, capacity_units: u32) -> Result<()>;

    async fn add_keyspace(&self, id: &str, keyspace: &str) -> Result<()>;

    async fn reset_password(&self, id: &str, username: &str, password: &str) -> Result<()>;

    async fn fetch_bundle(&self, id: &str) -> Result<BundleUrls>;

    async fn find(&self, id: &str) -> Result<ManagedResource>;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<ManagedResource>>;

    async fn list_tiers(&self) -> Result<Vec<TierInfo>>;
}

/// The control-plane client for one authenticated session
pub struct AuthenticatedClient {
    transport: Transport,
    session: AuthenticatedSession,
    waits: WaitPolicies,
    on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.transport.base_url().as_str())
            .field("session", &self.session)
            .field("waits", &self.waits)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    pub fn new(transport: Transport, session: AuthenticatedSession) -> Self {
        Self {
            transport,
            session,
            waits: WaitPolicies::default(),
            on_progress: None,
        }
    }

    /// Resolve credentials from `source` and build a client for `api_url`
    pub async fn connect(
        api_url: &str,
        source: &dyn CredentialSource,
        settings: SessionSettings,
    ) -> Result<Self> {
        let transport = Transport::new(api_url, settings.timeout)?;
        let session = authenticate(source, &transport as &dyn TokenExchange, settings).await?;
        Ok(Self::new(transport, session))
    }

    #[must_use]
    pub fn with_wait_policies(mut self, waits: WaitPolicies) -> Self {
        self.waits = waits;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn session(&self) -> &AuthenticatedSession {
        &self.session
    }

    pub fn wait_policies(&self) -> &WaitPolicies {
        &self.waits
    }

    /// Download the selected bundle variant
    pub async fn download_bundle(&self, urls: &BundleUrls, kind: BundleKind) -> Result<Vec<u8>> {
        let url = urls.url_for(kind).ok_or_else(|| {
            CoreError::UnexpectedResponse(format!("no {:?} bundle URL returned", kind))
        })?;
        self.transport.download(url).await
    }

    fn database_request(&self, method: reqwest::Method, id: &str, tail: &[&str]) -> ApiRequest {
        let segments = DATABASES
            .iter()
            .copied()
            .chain(std::iter::once(id))
            .chain(tail.iter().copied());
        ApiRequest::new(method, segments).bearer(self.session.token())
    }

    async fn send(&self, request: ApiRequest, expected: ExpectedStatus) -> Result<RawResponse> {
        let label = request.to_string();
        let response = self.transport.execute(request).await?;
        if self.session.verbose() {
            info!(request = %label, status = response.status, "Control plane responded");
        } else {
            debug!(request = %label, status = response.status, "Control plane responded");
        }
        classify(&response, expected)?;
        Ok(response)
    }

    async fn wait(&self, id: &str, target: WaitTarget, policy: WaitPolicy) -> Result<WaitOutcome> {
        wait_until(self, id, &target, policy, self.on_progress.as_ref()).await
    }

    async fn submit_and_wait(
        &self,
        op: Operation,
        id: &str,
        request: ApiRequest,
        target: WaitTarget,
        policy: WaitPolicy,
    ) -> Result<WaitOutcome> {
        self.send(request, ExpectedStatus::ACCEPTED).await?;
        info!(operation = %op, id, "Request accepted");
        self.wait(id, target, policy).await
    }
}

/// Database id from a `Location` header: the last non-empty path segment
pub fn id_from_location(location: &str) -> Option<&str> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').find(|segment| !segment.is_empty())
}

#[async_trait]
impl ResourceLookup for AuthenticatedClient {
    async fn lookup(&self, id: &str) -> Result<ManagedResource> {
        self.find(id).await
    }
}

#[async_trait]
impl ControlPlane for AuthenticatedClient {
    async fn create(&self, spec: &CreateResourceSpec) -> Result<ManagedResource> {
        let op = Operation::Create;
        spec.validate().map_err(|e| e.during(op, None))?;

        let request = ApiRequest::post(DATABASES)
            .bearer(self.session.token())
            .json(spec)
            .map_err(|e| e.during(op, None))?;
        let response = self
            .send(request, ExpectedStatus::CREATED)
            .await
            .map_err(|e| e.during(op, None))?;

        let id = response
            .location
            .as_deref()
            .and_then(id_from_location)
            .map(str::to_string)
            .ok_or_else(|| {
                CoreError::UnexpectedResponse(
                    "create returned 201 without a database id in the Location header".to_string(),
                )
                .during(op, None)
            })?;
        info!(id = %id, name = %spec.name, "Database creation accepted");

        match self
            .wait(&id, WaitTarget::status(Status::Active), self.waits.create)
            .await
            .map_err(|e| e.during(op, Some(&id)))?
        {
            WaitOutcome::Reached(resource) => Ok(resource),
            WaitOutcome::Gone => Err(CoreError::UnexpectedResponse(format!(
                "database {} disappeared while being created",
                id
            ))
            .during(op, Some(&id))),
        }
    }

    async fn terminate(&self, id: &str, prepared_state_only: bool) -> Result<()> {
        let op = Operation::Terminate;
        let request = self
            .database_request(reqwest::Method::POST, id, &["terminate"])
            .query("preparedStateOnly", prepared_state_only.to_string());
        // A 401/404 lookup after acceptance counts as terminated. This can
        // hide a real auth failure during polling.
        let target = WaitTarget::any_of([Status::Terminated, Status::Terminating]).or_gone();

        let outcome = self
            .submit_and_wait(op, id, request, target, self.waits.terminate)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        if outcome == WaitOutcome::Gone {
            info!(id, "Database no longer found after terminate");
        }
        Ok(())
    }

    async fn park(&self, id: &str) -> Result<()> {
        let op = Operation::Park;
        let request = self.database_request(reqwest::Method::POST, id, &["park"]);
        self.submit_and_wait(
            op,
            id,
            request,
            WaitTarget::status(Status::Parked),
            self.waits.park,
        )
        .await
        .map_err(|e| e.during(op, Some(id)))?;
        Ok(())
    }

    async fn unpark(&self, id: &str) -> Result<()> {
        let op = Operation::Unpark;
        let request = self.database_request(reqwest::Method::POST, id, &["unpark"]);
        self.submit_and_wait(
            op,
            id,
            request,
            WaitTarget::status(Status::Active),
            self.waits.unpark,
        )
        .await
        .map_err(|e| e.during(op, Some(id)))?;
        Ok(())
    }

    async fn resize(&self, id: &str, capacity_units: u32) -> Result<()> {
        let op = Operation::Resize;
        if capacity_units == 0 {
            return Err(
                CoreError::Validation("capacity units must be at least 1".to_string())
                    .during(op, Some(id)),
            );
        }
        let request = self
            .database_request(reqwest::Method::POST, id, &["resize"])
            .json(&CapacityChange { capacity_units })
            .map_err(|e| e.during(op, Some(id)))?;
        // Not polled: acceptance is completion.
        self.send(request, ExpectedStatus::AnySuccess)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        info!(id, capacity_units, "Resize accepted");
        Ok(())
    }

    async fn add_keyspace(&self, id: &str, keyspace: &str) -> Result<()> {
        let op = Operation::AddKeyspace;
        if keyspace.trim().is_empty() {
            return Err(CoreError::Validation("keyspace name is required".to_string())
                .during(op, Some(id)));
        }
        let request = self.database_request(reqwest::Method::POST, id, &["keyspaces", keyspace]);
        self.send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        info!(id, keyspace, "Keyspace added");
        Ok(())
    }

    async fn reset_password(&self, id: &str, username: &str, password: &str) -> Result<()> {
        let op = Operation::ResetPassword;
        if username.is_empty() || password.is_empty() {
            return Err(
                CoreError::Validation("username and password are required".to_string())
                    .during(op, Some(id)),
            );
        }
        let body = PasswordReset {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self
            .database_request(reqwest::Method::POST, id, &["resetPassword"])
            .json(&body)
            .map_err(|e| e.during(op, Some(id)))?;
        self.send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        info!(id, username, "Password reset");
        Ok(())
    }

    async fn fetch_bundle(&self, id: &str) -> Result<BundleUrls> {
        let op = Operation::FetchBundle;
        let request = self.database_request(reqwest::Method::POST, id, &["secureBundleURL"]);
        let response = self
            .send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        response.json().map_err(|e| e.during(op, Some(id)))
    }

    async fn find(&self, id: &str) -> Result<ManagedResource> {
        let op = Operation::Find;
        let request = self.database_request(reqwest::Method::GET, id, &[]);
        let response = self
            .send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, Some(id)))?;
        let resource: ManagedResource = response.json().map_err(|e| e.during(op, Some(id)))?;
        debug!(id, status = %resource.status, "Fetched database");
        Ok(resource)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<ManagedResource>> {
        let op = Operation::List;
        let request = ApiRequest::get(DATABASES)
            .bearer(self.session.token())
            .queries(filter.query_pairs());
        let response = self
            .send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, None))?;
        let resources: Vec<ManagedResource> = response.json().map_err(|e| e.during(op, None))?;
        debug!(count = resources.len(), "Listed databases");
        Ok(resources)
    }

    async fn list_tiers(&self) -> Result<Vec<TierInfo>> {
        let op = Operation::ListTiers;
        let request = ApiRequest::get(["v2", "availableRegions"]).bearer(self.session.token());
        let response = self
            .send(request, ExpectedStatus::OK)
            .await
            .map_err(|e| e.during(op, None))?;
        response.json().map_err(|e| e.during(op, None))
    }
}
