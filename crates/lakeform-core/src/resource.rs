//! Resource node and deployment state types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outputs produced by a successfully applied resource, keyed by output name.
pub type Outputs = BTreeMap<String, String>;

/// The kinds of infrastructure resources this tool knows how to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Hierarchical-namespace object storage for the data lake.
    DataLakeStore,
    /// Workspace-scoped managed identity used for data-plane access.
    ManagedIdentity,
    /// Role grant binding an identity to a storage scope.
    RoleAssignment,
    /// The data warehouse (SQL analytics) workspace.
    WarehouseWorkspace,
    /// The compute cluster (notebook/job) workspace.
    ComputeWorkspace,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::DataLakeStore => write!(f, "data-lake-store"),
            ResourceKind::ManagedIdentity => write!(f, "managed-identity"),
            ResourceKind::RoleAssignment => write!(f, "role-assignment"),
            ResourceKind::WarehouseWorkspace => write!(f, "warehouse-workspace"),
            ResourceKind::ComputeWorkspace => write!(f, "compute-workspace"),
        }
    }
}

/// One declared infrastructure resource.
///
/// Declared at graph-build time; its lifecycle within a run is tracked by
/// [`NodeState`]. Parameter values may reference outputs of dependencies
/// with `${node.key}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Identifier, unique within a configuration. Doubles as the
    /// control-plane deployment name.
    pub id: String,
    /// What to provision.
    pub kind: ResourceKind,
    /// Creation parameters, keys unique.
    pub params: BTreeMap<String, String>,
    /// Identifiers of resources that must be applied first.
    pub depends_on: Vec<String>,
    /// Disabled nodes are dropped when the graph is built.
    pub enabled: bool,
}

/// State of a resource node during an executor walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not yet reached by the walk.
    Pending,
    /// Created in this run; outputs captured.
    Applied,
    /// Found already provisioned in a terminal success state; outputs
    /// recovered without a create call.
    AlreadyApplied,
    /// Walk stopped before this node was applied.
    NotApplied,
}

impl NodeState {
    pub fn is_applied(&self) -> bool {
        matches!(self, NodeState::Applied | NodeState::AlreadyApplied)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Pending => write!(f, "pending"),
            NodeState::Applied => write!(f, "applied"),
            NodeState::AlreadyApplied => write!(f, "already-applied"),
            NodeState::NotApplied => write!(f, "not-applied"),
        }
    }
}

/// State of an existing control-plane deployment, as reported by
/// [`crate::client::ControlPlaneClient::query_status`].
///
/// A typed enumeration rather than raw status text: the executor matches on
/// these variants instead of scanning command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeploymentState {
    /// No deployment with this name exists.
    NotFound,
    /// A deployment is still running.
    InProgress,
    /// Terminal success; the recorded outputs are available.
    Succeeded { outputs: Outputs },
    /// Terminal failure. Re-applying over this is never done automatically.
    Failed { message: String },
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Succeeded { .. } | DeploymentState::Failed { .. }
        )
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentState::NotFound => write!(f, "not-found"),
            DeploymentState::InProgress => write!(f, "in-progress"),
            DeploymentState::Succeeded { .. } => write!(f, "succeeded"),
            DeploymentState::Failed { .. } => write!(f, "failed"),
        }
    }
}
