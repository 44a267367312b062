//! Post-deployment step types.
//!
//! Steps configure the data plane after the infrastructure exists: warehouse
//! settings, linked services, pipeline and notebook artifacts, sample data.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The kinds of data-plane configuration actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Execute a SQL batch against the warehouse.
    WarehouseSql,
    /// Register a linked service connecting the workspace to storage.
    LinkedService,
    /// Import a pipeline definition into the workspace.
    PipelineDefinition,
    /// Import a notebook into the compute workspace.
    NotebookImport,
    /// Provision a compute cluster.
    ClusterCreate,
    /// Copy sample data into lake storage.
    StorageCopy,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::WarehouseSql => write!(f, "warehouse-sql"),
            StepKind::LinkedService => write!(f, "linked-service"),
            StepKind::PipelineDefinition => write!(f, "pipeline-definition"),
            StepKind::NotebookImport => write!(f, "notebook-import"),
            StepKind::ClusterCreate => write!(f, "cluster-create"),
            StepKind::StorageCopy => write!(f, "storage-copy"),
        }
    }
}

/// Where a step's payload body comes from. Both forms are rendered with
/// `${node.key}` placeholder substitution before the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepTemplate {
    /// Payload given inline in the configuration.
    Inline(String),
    /// Payload read from a file, resolved relative to the configuration.
    File(PathBuf),
}

/// A check determining whether a step's effect is already present, so a
/// re-run avoids duplicate side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdempotencyCheck {
    /// No check; the action always runs.
    AlwaysRun,
    /// Skip if the named data-plane artifact already exists.
    ArtifactExists { kind: StepKind, name: String },
}

/// One data-plane configuration action performed after infrastructure exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDeployStep {
    /// Human-readable name, unique within a configuration.
    pub name: String,
    /// What kind of action this is.
    pub kind: StepKind,
    /// Name of the artifact/object on the data plane. May contain
    /// placeholders.
    pub target: String,
    /// Output keys (namespaced `node.key`) that must be present in the
    /// accumulated outputs before this step runs.
    pub requires: Vec<String>,
    /// The payload template.
    pub template: StepTemplate,
    /// Idempotency predicate evaluated before the action.
    pub check: IdempotencyCheck,
}

/// State of a step within a run. Terminal once left `Pending`; no step is
/// retried within a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Skipped { reason: String },
    Applied,
    Failed { message: String },
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepState::Pending)
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::Skipped { .. } => write!(f, "skipped"),
            StepState::Applied => write!(f, "applied"),
            StepState::Failed { .. } => write!(f, "failed"),
        }
    }
}
