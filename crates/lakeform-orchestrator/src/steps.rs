//! Post-deployment step runner.
//!
//! Runs the ordered data-plane configuration steps using the outputs the
//! executor accumulated. Per step: required outputs are verified first, then
//! the idempotency predicate, then the rendered action. The first failure
//! aborts the remaining steps; recovery is a re-run of the whole deploy,
//! relying on the idempotency predicates to avoid duplicate side effects.

use lakeform_core::client::{DataPlaneClient, StepError};
use lakeform_core::step::{IdempotencyCheck, PostDeployStep, StepState, StepTemplate};
use lakeform_core::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::context::RunContext;

/// Result of a step-runner pass: the state of every step plus the outcome.
/// Steps never reached stay `Pending`.
#[derive(Debug)]
pub struct StepReport {
    pub states: Vec<(String, StepState)>,
    pub result: Result<()>,
}

impl StepReport {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs post-deployment steps in order against the data plane.
pub struct StepRunner {
    client: Arc<dyn DataPlaneClient>,
    /// Directory relative template paths resolve against (the configuration
    /// file's directory).
    template_root: PathBuf,
}

impl StepRunner {
    pub fn new(client: Arc<dyn DataPlaneClient>, template_root: PathBuf) -> Self {
        Self {
            client,
            template_root,
        }
    }

    /// Run all steps in order. Sequential; a failure aborts the remainder.
    pub async fn run(&self, steps: &[PostDeployStep], ctx: &mut RunContext) -> StepReport {
        let mut states: Vec<(String, StepState)> = steps
            .iter()
            .map(|s| (s.name.clone(), StepState::Pending))
            .collect();

        for (idx, step) in steps.iter().enumerate() {
            ctx.step_index = idx;
            match self.run_step(step, ctx).await {
                Ok(state) => {
                    states[idx].1 = state;
                }
                Err(err) => {
                    error!(step = %step.name, error = %err, "step failed");
                    ctx.log.error(&err.to_string());
                    states[idx].1 = StepState::Failed {
                        message: err.to_string(),
                    };
                    return StepReport {
                        states,
                        result: Err(err),
                    };
                }
            }
        }

        info!(steps = steps.len(), "all post-deployment steps complete");
        ctx.log.info("all post-deployment steps complete");
        StepReport {
            states,
            result: Ok(()),
        }
    }

    async fn run_step(&self, step: &PostDeployStep, ctx: &mut RunContext) -> Result<StepState> {
        // Required outputs are verified before anything else runs.
        for key in &step.requires {
            if !ctx.has_output(key) {
                return Err(Error::MissingOutput {
                    step: step.name.clone(),
                    key: key.clone(),
                });
            }
        }

        if let IdempotencyCheck::ArtifactExists { kind, name } = &step.check {
            let name = ctx
                .template()
                .render(name)
                .map_err(|e| templating(step, e))?;
            let exists = self
                .client
                .artifact_exists(*kind, &name)
                .await
                .map_err(|e| classify(step, e))?;
            if exists {
                info!(step = %step.name, artifact = %name, "step already applied, skipping");
                ctx.log.info(&format!(
                    "step '{}' skipped: {} '{}' already exists",
                    step.name, kind, name
                ));
                return Ok(StepState::Skipped {
                    reason: format!("{} '{}' already exists", kind, name),
                });
            }
        }

        let target = ctx
            .template()
            .render(&step.target)
            .map_err(|e| templating(step, e))?;
        let body = self.load_template(step)?;
        let payload = ctx
            .template()
            .render(&body)
            .map_err(|e| templating(step, e))?;

        info!(step = %step.name, kind = %step.kind, target = %target, client = self.client.name(), "applying step");
        ctx.log.info(&format!(
            "step {} '{}' ({}) applying to '{}'",
            ctx.step_index + 1,
            step.name,
            step.kind,
            target
        ));

        self.client
            .apply(step.kind, &target, &payload)
            .await
            .map_err(|e| classify(step, e))?;

        ctx.log.info(&format!("step '{}' applied", step.name));
        Ok(StepState::Applied)
    }

    fn load_template(&self, step: &PostDeployStep) -> Result<String> {
        match &step.template {
            StepTemplate::Inline(body) => Ok(body.clone()),
            StepTemplate::File(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.template_root.join(path)
                };
                std::fs::read_to_string(&path).map_err(|e| Error::Templating {
                    scope: step.name.clone(),
                    message: format!("cannot read template '{}': {}", path.display(), e),
                })
            }
        }
    }
}

fn templating(step: &PostDeployStep, err: lakeform_config::TemplateError) -> Error {
    Error::Templating {
        scope: step.name.clone(),
        message: err.to_string(),
    }
}

/// Map the client's classified error into the run-level taxonomy, naming the
/// step.
fn classify(step: &PostDeployStep, err: StepError) -> Error {
    match err {
        StepError::PreconditionNotMet { message } => Error::PreconditionNotMet {
            step: step.name.clone(),
            message,
        },
        StepError::Connectivity { message } => Error::TransientConnectivity {
            step: step.name.clone(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runlog::RunLog;
    use async_trait::async_trait;
    use lakeform_core::resource::Outputs;
    use lakeform_core::step::StepKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockDataPlane {
        /// Artifacts the data plane already has, by name.
        existing: Vec<String>,
        /// Step targets whose apply call should fail, and how.
        fail_with: HashMap<String, StepError>,
        /// Every apply call, in order: (kind, target, payload).
        applied: Mutex<Vec<(StepKind, String, String)>>,
    }

    impl MockDataPlane {
        fn new() -> Self {
            Self {
                existing: Vec::new(),
                fail_with: HashMap::new(),
                applied: Mutex::new(Vec::new()),
            }
        }

        fn apply_count(&self) -> usize {
            self.applied.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DataPlaneClient for MockDataPlane {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn artifact_exists(
            &self,
            _kind: StepKind,
            name: &str,
        ) -> std::result::Result<bool, StepError> {
            Ok(self.existing.iter().any(|n| n == name))
        }

        async fn apply(
            &self,
            kind: StepKind,
            name: &str,
            payload: &str,
        ) -> std::result::Result<(), StepError> {
            if let Some(err) = self.fail_with.get(name) {
                return Err(err.clone());
            }
            self.applied
                .lock()
                .unwrap()
                .push((kind, name.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn make_step(name: &str, requires: Vec<&str>, body: &str) -> PostDeployStep {
        PostDeployStep {
            name: name.to_string(),
            kind: StepKind::LinkedService,
            target: name.to_string(),
            requires: requires.into_iter().map(String::from).collect(),
            template: StepTemplate::Inline(body.to_string()),
            check: IdempotencyCheck::AlwaysRun,
        }
    }

    fn ctx_with_storage_outputs() -> RunContext {
        let mut ctx = RunContext::new(RunLog::sink());
        let mut outputs = Outputs::new();
        outputs.insert(
            "dfs_endpoint".to_string(),
            "https://lake.dfs.example.net".to_string(),
        );
        ctx.record_outputs("storage", &outputs);
        ctx
    }

    fn runner(client: Arc<MockDataPlane>) -> StepRunner {
        StepRunner::new(client, PathBuf::from("."))
    }

    #[tokio::test]
    async fn test_renders_payload_from_outputs_and_applies() {
        let client = Arc::new(MockDataPlane::new());
        let mut ctx = ctx_with_storage_outputs();

        let steps = vec![make_step(
            "lake-linked-service",
            vec!["storage.dfs_endpoint"],
            r#"{"url": "${storage.dfs_endpoint}"}"#,
        )];

        let report = runner(client.clone()).run(&steps, &mut ctx).await;

        assert!(report.success());
        assert_eq!(report.states[0].1, StepState::Applied);
        let applied = client.applied.lock().unwrap();
        assert_eq!(
            applied[0].2,
            r#"{"url": "https://lake.dfs.example.net"}"#
        );
    }

    #[tokio::test]
    async fn test_missing_output_fails_before_action() {
        let client = Arc::new(MockDataPlane::new());
        let mut ctx = RunContext::new(RunLog::sink());

        let steps = vec![make_step(
            "lake-linked-service",
            vec!["storage.dfs_endpoint"],
            "{}",
        )];

        let report = runner(client.clone()).run(&steps, &mut ctx).await;

        match report.result.unwrap_err() {
            Error::MissingOutput { step, key } => {
                assert_eq!(step, "lake-linked-service");
                assert_eq!(key, "storage.dfs_endpoint");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_step_action_never_invoked() {
        let mut client = MockDataPlane::new();
        client.existing.push("lake".to_string());
        let client = Arc::new(client);
        let mut ctx = ctx_with_storage_outputs();

        let mut step = make_step("lake-linked-service", vec![], "{}");
        step.check = IdempotencyCheck::ArtifactExists {
            kind: StepKind::LinkedService,
            name: "lake".to_string(),
        };

        let report = runner(client.clone()).run(&[step], &mut ctx).await;

        assert!(report.success());
        assert!(matches!(report.states[0].1, StepState::Skipped { .. }));
        assert_eq!(client.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_precondition_failure_aborts_remaining_steps() {
        let mut client = MockDataPlane::new();
        client.fail_with.insert(
            "warehouse-settings".to_string(),
            StepError::PreconditionNotMet {
                message: "warehouse is paused".to_string(),
            },
        );
        let client = Arc::new(client);
        let mut ctx = ctx_with_storage_outputs();

        let steps = vec![
            make_step("warehouse-settings", vec![], "ALTER DATABASE ..."),
            make_step("sample-data", vec![], "{}"),
        ];

        let report = runner(client.clone()).run(&steps, &mut ctx).await;

        assert!(matches!(
            report.result.unwrap_err(),
            Error::PreconditionNotMet { ref step, .. } if step == "warehouse-settings"
        ));
        assert!(matches!(report.states[0].1, StepState::Failed { .. }));
        // The unreached step stays pending; it was never attempted.
        assert_eq!(report.states[1].1, StepState::Pending);
        assert_eq!(client.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_connectivity_failure_is_reported_distinctly() {
        let mut client = MockDataPlane::new();
        client.fail_with.insert(
            "sample-data".to_string(),
            StepError::Connectivity {
                message: "timed out reaching storage endpoint".to_string(),
            },
        );
        let client = Arc::new(client);
        let mut ctx = ctx_with_storage_outputs();

        let steps = vec![make_step("sample-data", vec![], "{}")];
        let report = runner(client).run(&steps, &mut ctx).await;

        assert!(matches!(
            report.result.unwrap_err(),
            Error::TransientConnectivity { ref step, .. } if step == "sample-data"
        ));
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_is_fatal() {
        let client = Arc::new(MockDataPlane::new());
        let mut ctx = RunContext::new(RunLog::sink());

        let steps = vec![make_step(
            "cluster",
            vec![],
            r#"{"workspace": "${compute.workspace_url}"}"#,
        )];

        let report = runner(client.clone()).run(&steps, &mut ctx).await;

        assert!(matches!(
            report.result.unwrap_err(),
            Error::Templating { ref scope, .. } if scope == "cluster"
        ));
        assert_eq!(client.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_file_template_resolved_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("linked_service.json"),
            r#"{"url": "${storage.dfs_endpoint}"}"#,
        )
        .unwrap();

        let client = Arc::new(MockDataPlane::new());
        let mut ctx = ctx_with_storage_outputs();

        let mut step = make_step("lake-linked-service", vec![], "");
        step.template = StepTemplate::File(PathBuf::from("linked_service.json"));

        let runner = StepRunner::new(client.clone(), dir.path().to_path_buf());
        let report = runner.run(&[step], &mut ctx).await;

        assert!(report.success());
        let applied = client.applied.lock().unwrap();
        assert!(applied[0].2.contains("https://lake.dfs.example.net"));
    }

    #[tokio::test]
    async fn test_missing_template_file_is_a_templating_error() {
        let client = Arc::new(MockDataPlane::new());
        let mut ctx = RunContext::new(RunLog::sink());

        let mut step = make_step("cluster", vec![], "");
        step.template = StepTemplate::File(PathBuf::from("does-not-exist.json"));

        let report = runner(client).run(&[step], &mut ctx).await;
        assert!(matches!(
            report.result.unwrap_err(),
            Error::Templating { .. }
        ));
    }
}
