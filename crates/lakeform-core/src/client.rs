//! Client traits for the control plane and data plane.
//!
//! The orchestrator never talks to a cloud API directly; it is handed
//! implementations of these traits (REST in production, mocks in tests).
//! Both traits return classified errors so callers match on error kinds
//! instead of parsing message text.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::resource::{DeploymentState, Outputs, ResourceKind};
use crate::step::StepKind;

/// Error from a control-plane call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The control plane accepted the request and rejected it.
    #[error("control plane rejected the request: {message}")]
    Rejected { message: String },

    /// The control plane could not be reached (timeout, connection refused).
    #[error("connectivity failure: {message}")]
    Connectivity { message: String },
}

/// Error from a data-plane call, classified for the step runner.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The target exists but is not in a state that can serve the request
    /// (e.g. warehouse paused, cluster not running). Re-running alone will
    /// not fix this.
    #[error("precondition not met: {message}")]
    PreconditionNotMet { message: String },

    /// The target endpoint could not be reached in time. A plain re-run is
    /// likely to succeed.
    #[error("connectivity failure: {message}")]
    Connectivity { message: String },
}

/// Control-plane operations: resource creation and deployment status.
///
/// Implementations are assumed already authenticated; a session/credential
/// provider sits behind them, not in front.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Name of this client, for logs.
    fn name(&self) -> &'static str;

    /// Create a resource. `name` is the deployment name the result can later
    /// be queried under. Returns the outputs the resource produced.
    async fn create(
        &self,
        kind: ResourceKind,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Outputs, ClientError>;

    /// Query the state of an existing deployment by name.
    async fn query_status(&self, name: &str) -> Result<DeploymentState, ClientError>;
}

/// Data-plane operations: artifact probes and configuration calls.
#[async_trait]
pub trait DataPlaneClient: Send + Sync {
    /// Name of this client, for logs.
    fn name(&self) -> &'static str;

    /// Whether the named artifact already exists on the data plane.
    async fn artifact_exists(&self, kind: StepKind, name: &str) -> Result<bool, StepError>;

    /// Apply a rendered payload to the named data-plane target.
    async fn apply(&self, kind: StepKind, name: &str, payload: &str) -> Result<(), StepError>;
}
