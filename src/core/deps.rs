//! Dependency graph over install units.
//!
//! Topological sort with cycle detection. Uses iterative DFS with state
//! tracking so deep graphs never hit recursion limits.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unit not found: {0}")]
    NotFound(String),

    #[error("'{unit}' depends on missing unit '{dep}'")]
    MissingDependency { unit: String, dep: String },

    #[error("dependency cycle detected: {from} -> {to}")]
    Cycle { from: String, to: String },
}

/// Node state for DFS traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Not yet visited
    Unprocessed,
    /// Currently being processed (on the stack)
    Processing,
    /// Fully processed (all dependencies resolved)
    Processed,
}

/// A dependency graph for topological sorting
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    /// Map from unit name to its dependencies, in declaration order
    edges: HashMap<String, Vec<String>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit and its dependencies to the graph
    pub fn add_unit(&mut self, name: impl Into<String>, deps: Vec<String>) {
        self.edges.insert(name.into(), deps);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    pub fn dependencies(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Units needed for `targets`, dependencies before dependents.
    pub fn topological_sort(&self, targets: &[&str]) -> Result<Vec<String>, GraphError> {
        self.validate_dependencies()?;

        let mut state: HashMap<String, NodeState> = self
            .edges
            .keys()
            .map(|name| (name.clone(), NodeState::Unprocessed))
            .collect();
        let mut result: Vec<String> = Vec::new();

        for target in targets {
            if !self.edges.contains_key(*target) {
                return Err(GraphError::NotFound(target.to_string()));
            }
            self.dfs_visit(target.to_string(), &mut state, &mut result)?;
        }

        Ok(result)
    }

    /// Every dependency must reference a unit in the graph. Reports the
    /// alphabetically first offender so errors are stable.
    fn validate_dependencies(&self) -> Result<(), GraphError> {
        let mut missing: Vec<(&String, &String)> = self
            .edges
            .iter()
            .flat_map(|(unit, deps)| deps.iter().map(move |dep| (unit, dep)))
            .filter(|(_, dep)| !self.edges.contains_key(*dep))
            .collect();
        missing.sort();

        match missing.first() {
            Some((unit, dep)) => Err(GraphError::MissingDependency {
                unit: unit.to_string(),
                dep: dep.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Iterative DFS with explicit stack to avoid recursion limits
    fn dfs_visit(
        &self,
        start: String,
        state: &mut HashMap<String, NodeState>,
        result: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        // (node, index of next child to visit)
        let mut stack: Vec<(String, usize)> = vec![(start, 0)];

        while let Some((node, child_idx)) = stack.pop() {
            let deps = self.dependencies(&node);

            match state.get(&node).copied().unwrap_or(NodeState::Unprocessed) {
                NodeState::Processed => continue,
                NodeState::Processing => {
                    if child_idx >= deps.len() {
                        state.insert(node.clone(), NodeState::Processed);
                        result.push(node);
                        continue;
                    }
                }
                NodeState::Unprocessed => {
                    state.insert(node.clone(), NodeState::Processing);
                }
            }

            let mut found_unprocessed = false;
            for (i, dep) in deps.iter().enumerate().skip(child_idx) {
                match state.get(dep).copied().unwrap_or(NodeState::Unprocessed) {
                    NodeState::Unprocessed => {
                        stack.push((node.clone(), i + 1));
                        stack.push((dep.clone(), 0));
                        found_unprocessed = true;
                        break;
                    }
                    NodeState::Processing => {
                        return Err(GraphError::Cycle {
                            from: node.clone(),
                            to: dep.clone(),
                        });
                    }
                    NodeState::Processed => {}
                }
            }

            if !found_unprocessed {
                // all children done; come back to finalize
                stack.push((node, deps.len()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DepGraph::new();
        assert!(graph.topological_sort(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_linear_deps() {
        let mut graph = DepGraph::new();
        graph.add_unit("metis", vec![]);
        graph.add_unit("mumps", deps(&["metis"]));
        graph.add_unit("ipopt", deps(&["mumps"]));

        let order = graph.topological_sort(&["ipopt"]).unwrap();
        assert_eq!(order, vec!["metis", "mumps", "ipopt"]);
    }

    #[test]
    fn test_diamond_deps() {
        //     d
        //    / \
        //   b   c
        //    \ /
        //     a
        let mut graph = DepGraph::new();
        graph.add_unit("a", vec![]);
        graph.add_unit("b", deps(&["a"]));
        graph.add_unit("c", deps(&["a"]));
        graph.add_unit("d", deps(&["b", "c"]));

        let order = graph.topological_sort(&["d"]).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = DepGraph::new();
        graph.add_unit("a", deps(&["c"]));
        graph.add_unit("b", deps(&["a"]));
        graph.add_unit("c", deps(&["b"]));

        let err = graph.topological_sort(&["a"]).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_self_cycle() {
        let mut graph = DepGraph::new();
        graph.add_unit("a", deps(&["a"]));
        assert!(matches!(
            graph.topological_sort(&["a"]),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn test_missing_target() {
        let graph = DepGraph::new();
        assert_eq!(
            graph.topological_sort(&["ipopt"]),
            Err(GraphError::NotFound("ipopt".to_string()))
        );
    }

    #[test]
    fn test_missing_dependency() {
        let mut graph = DepGraph::new();
        graph.add_unit("ipopt", deps(&["mumps"]));
        assert_eq!(
            graph.topological_sort(&["ipopt"]),
            Err(GraphError::MissingDependency {
                unit: "ipopt".to_string(),
                dep: "mumps".to_string(),
            })
        );
    }

    #[test]
    fn test_multiple_targets_share_deps() {
        let mut graph = DepGraph::new();
        graph.add_unit("metis", vec![]);
        graph.add_unit("mumps", deps(&["metis"]));
        graph.add_unit("ipopt", deps(&["mumps"]));
        graph.add_unit("paropt", deps(&["metis"]));

        let order = graph.topological_sort(&["ipopt", "paropt"]).unwrap();
        assert_eq!(order, vec!["metis", "mumps", "ipopt", "paropt"]);
    }
}
