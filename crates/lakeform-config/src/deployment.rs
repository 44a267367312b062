//! Deployment configuration parsing.
//!
//! A deployment document declares `resource` nodes (the infrastructure DAG)
//! and `step` nodes (the ordered post-deployment actions):
//!
//! ```kdl
//! deployment "analytics-env"
//!
//! resource "storage" kind="data-lake-store" {
//!     params {
//!         location "eastus2"
//!         replication "LRS"
//!     }
//! }
//!
//! resource "identity" kind="managed-identity" depends-on="storage"
//!
//! step "lake-linked-service" kind="linked-service" target="lake" \
//!         requires="storage.dfs_endpoint" {
//!     template file="templates/linked_service.json"
//!     check "artifact-exists" kind="linked-service" name="lake"
//! }
//! ```
//!
//! Dependency resolution and cycle checks belong to the graph builder, not
//! the parser; parsing only enforces structural rules (unique identifiers,
//! known kinds, required fields).

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use lakeform_core::resource::{ResourceKind, ResourceNode};
use lakeform_core::step::{IdempotencyCheck, PostDeployStep, StepKind, StepTemplate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A parsed deployment: the declared resources and the ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment name (e.g. "analytics-env").
    pub name: String,
    /// Declared resources, in declaration order.
    pub resources: Vec<ResourceNode>,
    /// Post-deployment steps, in execution order.
    pub steps: Vec<PostDeployStep>,
}

/// Parse a deployment configuration from KDL text.
pub fn parse_deployment(kdl: &str) -> ConfigResult<DeploymentConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut name = String::new();
    let mut resources: Vec<ResourceNode> = Vec::new();
    let mut steps: Vec<PostDeployStep> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "deployment" => {
                name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("deployment name".to_string()))?;
            }
            "resource" => {
                let resource = parse_resource(node)?;
                if resources.iter().any(|r| r.id == resource.id) {
                    return Err(ConfigError::Duplicate(format!(
                        "resource '{}'",
                        resource.id
                    )));
                }
                resources.push(resource);
            }
            "step" => {
                let step = parse_step(node)?;
                if steps.iter().any(|s| s.name == step.name) {
                    return Err(ConfigError::Duplicate(format!("step '{}'", step.name)));
                }
                steps.push(step);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if name.is_empty() {
        return Err(ConfigError::MissingField("deployment name".to_string()));
    }

    Ok(DeploymentConfig {
        name,
        resources,
        steps,
    })
}

fn parse_resource(node: &KdlNode) -> ConfigResult<ResourceNode> {
    let id = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("resource id".to_string()))?;

    let kind_str = get_string_prop(node, "kind")
        .ok_or_else(|| ConfigError::MissingField(format!("kind for resource '{}'", id)))?;
    let kind = parse_resource_kind(&kind_str)?;

    let depends_on = get_string_list_prop(node, "depends-on");
    let enabled = get_bool_prop(node, "enabled").unwrap_or(true);

    let mut params = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "params" {
                if let Some(grandchildren) = child.children() {
                    for gc in grandchildren.nodes() {
                        let key = gc.name().value().to_string();
                        let value = get_first_string_arg(gc).ok_or_else(|| {
                            ConfigError::MissingField(format!(
                                "value for param '{}' of resource '{}'",
                                key, id
                            ))
                        })?;
                        if params.insert(key.clone(), value).is_some() {
                            return Err(ConfigError::Duplicate(format!(
                                "param '{}' of resource '{}'",
                                key, id
                            )));
                        }
                    }
                }
            }
        }
    }

    Ok(ResourceNode {
        id,
        kind,
        params,
        depends_on,
        enabled,
    })
}

fn parse_step(node: &KdlNode) -> ConfigResult<PostDeployStep> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("step name".to_string()))?;

    let kind_str = get_string_prop(node, "kind")
        .ok_or_else(|| ConfigError::MissingField(format!("kind for step '{}'", name)))?;
    let kind = parse_step_kind(&kind_str)?;

    let target = get_string_prop(node, "target")
        .ok_or_else(|| ConfigError::MissingField(format!("target for step '{}'", name)))?;

    let requires = get_string_list_prop(node, "requires");

    let mut template = None;
    let mut check = IdempotencyCheck::AlwaysRun;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "template" => {
                    template = Some(parse_template(child, &name)?);
                }
                "check" => {
                    check = parse_check(child, &name)?;
                }
                _ => {}
            }
        }
    }

    let template = template
        .ok_or_else(|| ConfigError::MissingField(format!("template for step '{}'", name)))?;

    Ok(PostDeployStep {
        name,
        kind,
        target,
        requires,
        template,
        check,
    })
}

fn parse_template(node: &KdlNode, step: &str) -> ConfigResult<StepTemplate> {
    if let Some(path) = get_string_prop(node, "file") {
        return Ok(StepTemplate::File(PathBuf::from(path)));
    }
    if let Some(body) = get_first_string_arg(node) {
        return Ok(StepTemplate::Inline(body));
    }
    Err(ConfigError::InvalidValue {
        field: format!("template for step '{}'", step),
        message: "expected an inline body or a file=\"...\" property".to_string(),
    })
}

fn parse_check(node: &KdlNode, step: &str) -> ConfigResult<IdempotencyCheck> {
    let check_type = get_first_string_arg(node).unwrap_or_default();

    match check_type.as_str() {
        "always-run" | "" => Ok(IdempotencyCheck::AlwaysRun),
        "artifact-exists" => {
            let kind_str = get_string_prop(node, "kind").ok_or_else(|| {
                ConfigError::MissingField(format!("check kind for step '{}'", step))
            })?;
            let name = get_string_prop(node, "name").ok_or_else(|| {
                ConfigError::MissingField(format!("check name for step '{}'", step))
            })?;
            Ok(IdempotencyCheck::ArtifactExists {
                kind: parse_step_kind(&kind_str)?,
                name,
            })
        }
        other => Err(ConfigError::InvalidValue {
            field: format!("check for step '{}'", step),
            message: format!("unknown check type: {}", other),
        }),
    }
}

fn parse_resource_kind(s: &str) -> ConfigResult<ResourceKind> {
    match s {
        "data-lake-store" => Ok(ResourceKind::DataLakeStore),
        "managed-identity" => Ok(ResourceKind::ManagedIdentity),
        "role-assignment" => Ok(ResourceKind::RoleAssignment),
        "warehouse-workspace" => Ok(ResourceKind::WarehouseWorkspace),
        "compute-workspace" => Ok(ResourceKind::ComputeWorkspace),
        other => Err(ConfigError::InvalidValue {
            field: "resource kind".to_string(),
            message: format!("unknown resource kind: {}", other),
        }),
    }
}

fn parse_step_kind(s: &str) -> ConfigResult<StepKind> {
    match s {
        "warehouse-sql" => Ok(StepKind::WarehouseSql),
        "linked-service" => Ok(StepKind::LinkedService),
        "pipeline-definition" => Ok(StepKind::PipelineDefinition),
        "notebook-import" => Ok(StepKind::NotebookImport),
        "cluster-create" => Ok(StepKind::ClusterCreate),
        "storage-copy" => Ok(StepKind::StorageCopy),
        other => Err(ConfigError::InvalidValue {
            field: "step kind".to_string(),
            message: format!("unknown step kind: {}", other),
        }),
    }
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

fn get_string_list_prop(node: &KdlNode, name: &str) -> Vec<String> {
    let mut result = Vec::new();

    // Collect all entries with this name (handles repeated attributes like
    // depends-on="a" depends-on="b")
    for entry in node.entries() {
        if let Some(entry_name) = entry.name() {
            if entry_name.value() == name {
                if let Some(s) = entry.value().as_string() {
                    result.push(s.to_string());
                }
            }
        }
    }

    if !result.is_empty() {
        return result;
    }

    // Check children for the property name (handles block syntax)
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == name {
                return get_all_string_args(child);
            }
        }
    }

    Vec::new()
}
