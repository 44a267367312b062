//! Deployment executor.
//!
//! Walks the graph's linearization, applying each node through the
//! control-plane client and capturing outputs into the run context. The walk
//! stops on the first failure; nodes already applied stay applied, nodes not
//! yet reached are marked not-applied. Nothing is retried automatically.

use lakeform_core::client::ControlPlaneClient;
use lakeform_core::resource::{DeploymentState, NodeState, ResourceNode};
use lakeform_core::{ApplyFailure, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::context::RunContext;
use crate::graph::DeploymentGraph;

/// Result of an executor walk: the terminal state of every node plus the
/// walk outcome.
#[derive(Debug)]
pub struct ExecutorReport {
    pub states: BTreeMap<String, NodeState>,
    pub result: Result<()>,
}

impl ExecutorReport {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Applies resource nodes in dependency order.
pub struct DeploymentExecutor {
    client: Arc<dyn ControlPlaneClient>,
    skip_if_applied: bool,
}

impl DeploymentExecutor {
    pub fn new(client: Arc<dyn ControlPlaneClient>, skip_if_applied: bool) -> Self {
        Self {
            client,
            skip_if_applied,
        }
    }

    /// Walk the graph, applying every node. Sequential; one node at a time.
    pub async fn run(&self, graph: &DeploymentGraph, ctx: &mut RunContext) -> ExecutorReport {
        let mut states: BTreeMap<String, NodeState> = graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), NodeState::Pending))
            .collect();

        for node in graph.linearization() {
            match self.apply_node(node, ctx).await {
                Ok(applied) => {
                    states.insert(node.id.clone(), applied);
                }
                Err(err) => {
                    error!(node = %node.id, error = %err, "resource apply failed");
                    ctx.log.error(&err.to_string());
                    // The failed node and everything not yet reached.
                    for state in states.values_mut() {
                        if *state == NodeState::Pending {
                            *state = NodeState::NotApplied;
                        }
                    }
                    return ExecutorReport {
                        states,
                        result: Err(err),
                    };
                }
            }
        }

        info!(resources = graph.len(), "all resources applied");
        ctx.log.info("all resources applied");
        ExecutorReport {
            states,
            result: Ok(()),
        }
    }

    async fn apply_node(&self, node: &ResourceNode, ctx: &mut RunContext) -> Result<NodeState> {
        if self.skip_if_applied {
            let state = self
                .client
                .query_status(&node.id)
                .await
                .map_err(|e| Error::ResourceApplyFailed {
                    node: node.id.clone(),
                    source: ApplyFailure::Client(e),
                })?;

            match state {
                DeploymentState::Succeeded { outputs } => {
                    ctx.record_outputs(&node.id, &outputs);
                    info!(node = %node.id, "deployment already succeeded, outputs recovered");
                    ctx.log.info(&format!(
                        "resource '{}' already applied, outputs recovered",
                        node.id
                    ));
                    return Ok(NodeState::AlreadyApplied);
                }
                DeploymentState::Failed { message } => {
                    // A prior failed deployment must be remedied manually,
                    // never silently re-applied over.
                    return Err(Error::ResourceApplyFailed {
                        node: node.id.clone(),
                        source: ApplyFailure::ExistingDeployment {
                            state: "failed".to_string(),
                            message,
                        },
                    });
                }
                DeploymentState::InProgress => {
                    return Err(Error::ResourceApplyFailed {
                        node: node.id.clone(),
                        source: ApplyFailure::ExistingDeployment {
                            state: "in-progress".to_string(),
                            message: "another deployment with this name is still running"
                                .to_string(),
                        },
                    });
                }
                DeploymentState::NotFound => {}
            }
        }

        // Params may reference outputs of dependencies.
        let params = ctx
            .template()
            .render_map(&node.params)
            .map_err(|e| Error::Templating {
                scope: node.id.clone(),
                message: e.to_string(),
            })?;

        info!(node = %node.id, kind = %node.kind, client = self.client.name(), "creating resource");
        ctx.log
            .info(&format!("creating resource '{}' ({})", node.id, node.kind));

        let outputs = self
            .client
            .create(node.kind, &node.id, &params)
            .await
            .map_err(|e| Error::ResourceApplyFailed {
                node: node.id.clone(),
                source: e.into(),
            })?;

        ctx.record_outputs(&node.id, &outputs);
        ctx.log.info(&format!("resource '{}' applied", node.id));
        Ok(NodeState::Applied)
    }
}
