//! Error taxonomy for lakeform.
//!
//! Build-time errors (`CycleDetected`, `UnresolvedDependency`) require
//! editing the configuration. Run-time errors abort the remainder of the
//! current phase; nothing is retried automatically.

use thiserror::Error;

use crate::client::ClientError;

/// Why applying a resource failed.
#[derive(Debug, Error)]
pub enum ApplyFailure {
    /// The create call itself failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An existing deployment with the same name is in a state that blocks
    /// re-application. A prior failure must be remedied manually, not
    /// silently retried.
    #[error("existing deployment is {state}: {message}")]
    ExistingDeployment { state: String, message: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cycle detected in resource dependencies at '{node}'")]
    CycleDetected { node: String },

    #[error("resource '{node}' depends on unknown or disabled resource '{dependency}'")]
    UnresolvedDependency { node: String, dependency: String },

    #[error("failed to apply resource '{node}': {source}")]
    ResourceApplyFailed {
        node: String,
        #[source]
        source: ApplyFailure,
    },

    #[error("step '{step}': precondition not met: {message}")]
    PreconditionNotMet { step: String, message: String },

    #[error("step '{step}': connectivity failure (a re-run is likely to succeed): {message}")]
    TransientConnectivity { step: String, message: String },

    #[error("step '{step}' requires output '{key}', which no applied resource produced")]
    MissingOutput { step: String, key: String },

    #[error("templating failed for '{scope}': {message}")]
    Templating { scope: String, message: String },
}

impl Error {
    /// The node or step this error names, for one-line diagnostics.
    pub fn offender(&self) -> &str {
        match self {
            Error::CycleDetected { node }
            | Error::UnresolvedDependency { node, .. }
            | Error::ResourceApplyFailed { node, .. } => node,
            Error::PreconditionNotMet { step, .. }
            | Error::TransientConnectivity { step, .. }
            | Error::MissingOutput { step, .. } => step,
            Error::Templating { scope, .. } => scope,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
