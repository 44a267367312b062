//! Deployment orchestration for lakeform.
//!
//! Builds the resource dependency graph, walks it through the control-plane
//! client, then runs the post-deployment steps against the data plane. One
//! logical worker; everything is sequential.

pub mod context;
pub mod deploy;
pub mod executor;
pub mod graph;
pub mod runlog;
pub mod steps;

pub use context::RunContext;
pub use deploy::{DeploymentReport, run_deployment};
pub use executor::{DeploymentExecutor, ExecutorReport};
pub use graph::DeploymentGraph;
pub use runlog::RunLog;
pub use steps::{StepReport, StepRunner};
