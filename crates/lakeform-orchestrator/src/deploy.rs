//! One full deployment run: resources first, then steps.
//!
//! The two phases are strictly ordered: the step runner is never invoked
//! unless every resource applied. After a resource failure all steps stay
//! `Pending` and no data-plane call is made.

use lakeform_core::step::PostDeployStep;
use lakeform_core::{Error, Result};

use crate::context::RunContext;
use crate::executor::{DeploymentExecutor, ExecutorReport};
use crate::graph::DeploymentGraph;
use crate::steps::{StepReport, StepRunner};

/// Outcome of a full run. `steps` is `None` when the resource walk failed
/// and the step phase never started.
#[derive(Debug)]
pub struct DeploymentReport {
    pub resources: ExecutorReport,
    pub steps: Option<StepReport>,
}

impl DeploymentReport {
    pub fn success(&self) -> bool {
        self.error().is_none()
    }

    /// The fatal error of whichever phase failed, if any.
    pub fn error(&self) -> Option<&Error> {
        self.resources
            .result
            .as_ref()
            .err()
            .or_else(|| self.steps.as_ref().and_then(|s| s.result.as_ref().err()))
    }

    pub fn into_result(self) -> Result<()> {
        self.resources.result?;
        if let Some(steps) = self.steps {
            steps.result?;
        }
        Ok(())
    }
}

/// Run a deployment end to end: apply every resource, then run every step.
pub async fn run_deployment(
    executor: &DeploymentExecutor,
    runner: &StepRunner,
    graph: &DeploymentGraph,
    steps: &[PostDeployStep],
    ctx: &mut RunContext,
) -> DeploymentReport {
    let resources = executor.run(graph, ctx).await;
    if resources.result.is_err() {
        return DeploymentReport {
            resources,
            steps: None,
        };
    }

    let steps = runner.run(steps, ctx).await;
    DeploymentReport {
        resources,
        steps: Some(steps),
    }
}
