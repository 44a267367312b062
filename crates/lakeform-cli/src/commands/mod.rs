//! CLI command implementations.

use anyhow::{Context, Result};
use lakeform_client::RestClient;
use lakeform_config::parse_deployment;
use lakeform_core::resource::NodeState;
use lakeform_core::step::StepState;
use lakeform_orchestrator::{
    DeploymentExecutor, DeploymentGraph, ExecutorReport, RunContext, RunLog, StepReport,
    StepRunner, run_deployment,
};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Run a full deployment: the resource walk, then the post-deployment steps.
pub async fn deploy(
    api_url: &str,
    config_path: &str,
    skip_if_applied: bool,
    log_file: &str,
) -> Result<()> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path))?;
    let config = parse_deployment(&content)
        .with_context(|| format!("Failed to parse deployment config: {}", config_path))?;
    let graph = DeploymentGraph::build(&config.resources)?;

    println!("Deploying: {}", config.name);
    println!(
        "Resources: {} (enabled)  Steps: {}",
        graph.len(),
        config.steps.len()
    );
    if skip_if_applied {
        println!("Mode: skip resources whose deployments already succeeded");
    }

    let base_url = Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;
    let client = Arc::new(
        RestClient::from_env(base_url).context("Failed to build the HTTP client")?,
    );

    let log = RunLog::to_file(Path::new(log_file))
        .with_context(|| format!("Failed to open run log: {}", log_file))?;
    let mut ctx = RunContext::new(log);
    ctx.log.info(&format!(
        "run {} started for deployment '{}'",
        ctx.run_id, config.name
    ));

    // Relative template paths resolve next to the configuration file.
    let template_root = Path::new(config_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let executor = DeploymentExecutor::new(client.clone(), skip_if_applied);
    let runner = StepRunner::new(client, template_root);
    let report = run_deployment(&executor, &runner, &graph, &config.steps, &mut ctx).await;

    println!("\nResources:");
    print_resource_summary(&report.resources);
    if let Some(step_report) = &report.steps {
        println!("\nSteps:");
        print_step_summary(step_report);
    }
    if let Some(e) = report.error() {
        eprintln!("deployment failed at '{}'", e.offender());
    }
    report.into_result()?;

    ctx.log.info(&format!("run {} succeeded", ctx.run_id));
    println!("\n✓ Deployment succeeded");
    Ok(())
}

/// Parse and graph-validate a configuration without touching any API.
pub fn validate(path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;

    let config = match parse_deployment(&content) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match DeploymentGraph::build(&config.resources) {
        Ok(graph) => {
            println!(
                "Configuration is valid ({} resources, {} steps)",
                graph.len(),
                config.steps.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_resource_summary(report: &ExecutorReport) {
    for (node, state) in &report.states {
        let marker = match state {
            NodeState::Applied => "✓",
            NodeState::AlreadyApplied => "⊘",
            NodeState::NotApplied => "✗",
            NodeState::Pending => "○",
        };
        println!("  {} {} - {}", marker, node, state);
    }
}

fn print_step_summary(report: &StepReport) {
    for (step, state) in &report.states {
        let marker = match state {
            StepState::Applied => "✓",
            StepState::Skipped { .. } => "⊘",
            StepState::Failed { .. } => "✗",
            StepState::Pending => "○",
        };
        match state {
            StepState::Skipped { reason } => println!("  {} {} - skipped: {}", marker, step, reason),
            StepState::Failed { message } => println!("  {} {} - failed: {}", marker, step, message),
            _ => println!("  {} {} - {}", marker, step, state),
        }
    }
}
