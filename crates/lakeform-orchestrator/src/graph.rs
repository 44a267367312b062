//! Resource graph builder.
//!
//! Validates the declared resources into a DAG and fixes a deterministic
//! linearization: DFS post-order seeded in declaration order, so ties break
//! by declaration order.

use lakeform_core::resource::ResourceNode;
use lakeform_core::{Error, Result};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    OnPath,
    Done,
}

/// A validated deployment graph: acyclic, every dependency resolved, and a
/// linearization where every node appears after all its dependencies.
#[derive(Debug, Clone)]
pub struct DeploymentGraph {
    nodes: Vec<ResourceNode>,
    order: Vec<usize>,
}

impl DeploymentGraph {
    /// Build and validate a graph from declared resources.
    ///
    /// Disabled nodes are dropped before validation; a dependency on a
    /// disabled node is therefore unresolved, the same as a dependency on an
    /// undeclared one. No side effects; never returns a partial graph.
    pub fn build(declared: &[ResourceNode]) -> Result<Self> {
        let nodes: Vec<ResourceNode> = declared.iter().filter(|n| n.enabled).cloned().collect();

        let index_of: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        for node in &nodes {
            for dep in &node.depends_on {
                if !index_of.contains_key(dep.as_str()) {
                    return Err(Error::UnresolvedDependency {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut state = vec![VisitState::Unvisited; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());
        for idx in 0..nodes.len() {
            Self::visit(idx, &nodes, &index_of, &mut state, &mut order)?;
        }

        Ok(Self { nodes, order })
    }

    fn visit(
        idx: usize,
        nodes: &[ResourceNode],
        index_of: &HashMap<&str, usize>,
        state: &mut [VisitState],
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match state[idx] {
            VisitState::Done => return Ok(()),
            VisitState::OnPath => {
                return Err(Error::CycleDetected {
                    node: nodes[idx].id.clone(),
                });
            }
            VisitState::Unvisited => {}
        }

        state[idx] = VisitState::OnPath;
        for dep in &nodes[idx].depends_on {
            // Resolved above; the map lookup cannot miss.
            if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                Self::visit(dep_idx, nodes, index_of, state, order)?;
            }
        }
        state[idx] = VisitState::Done;
        order.push(idx);
        Ok(())
    }

    /// Nodes in declaration order (enabled only).
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Nodes in apply order: every node after all of its dependencies.
    pub fn linearization(&self) -> impl Iterator<Item = &ResourceNode> {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeform_core::resource::ResourceKind;
    use std::collections::BTreeMap;

    fn make_node(id: &str, deps: Vec<&str>) -> ResourceNode {
        ResourceNode {
            id: id.to_string(),
            kind: ResourceKind::DataLakeStore,
            params: BTreeMap::new(),
            depends_on: deps.into_iter().map(String::from).collect(),
            enabled: true,
        }
    }

    fn position(graph: &DeploymentGraph, id: &str) -> usize {
        graph.linearization().position(|n| n.id == id).unwrap()
    }

    #[test]
    fn test_linearization_respects_dependencies() {
        let nodes = vec![
            make_node("workspace", vec!["storage", "identity"]),
            make_node("identity", vec!["storage"]),
            make_node("storage", vec![]),
        ];

        let graph = DeploymentGraph::build(&nodes).unwrap();

        assert!(position(&graph, "storage") < position(&graph, "identity"));
        assert!(position(&graph, "storage") < position(&graph, "workspace"));
        assert!(position(&graph, "identity") < position(&graph, "workspace"));
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let nodes = vec![
            make_node("b", vec![]),
            make_node("a", vec![]),
            make_node("c", vec![]),
        ];

        let graph = DeploymentGraph::build(&nodes).unwrap();
        let order: Vec<&str> = graph.linearization().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_detected() {
        let nodes = vec![
            make_node("a", vec!["b"]),
            make_node("b", vec!["c"]),
            make_node("c", vec!["a"]),
        ];

        let err = DeploymentGraph::build(&nodes).unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let nodes = vec![make_node("a", vec!["a"])];
        let err = DeploymentGraph::build(&nodes).unwrap_err();
        assert!(matches!(err, Error::CycleDetected { node } if node == "a"));
    }

    #[test]
    fn test_unresolved_dependency() {
        let nodes = vec![make_node("workspace", vec!["storage"])];

        let err = DeploymentGraph::build(&nodes).unwrap_err();
        match err {
            Error::UnresolvedDependency { node, dependency } => {
                assert_eq!(node, "workspace");
                assert_eq!(dependency, "storage");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_disabled_nodes_are_dropped() {
        let mut disabled = make_node("optional-cluster", vec![]);
        disabled.enabled = false;
        let nodes = vec![make_node("storage", vec![]), disabled];

        let graph = DeploymentGraph::build(&nodes).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.nodes()[0].id, "storage");
    }

    #[test]
    fn test_dependency_on_disabled_node_is_unresolved() {
        let mut disabled = make_node("identity", vec![]);
        disabled.enabled = false;
        let nodes = vec![disabled, make_node("workspace", vec!["identity"])];

        let err = DeploymentGraph::build(&nodes).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDependency { .. }));
    }
}
