use std::collections::{BTreeMap, HashMap};

use crate::task::TaskDef;

/// One node in a DAG shape. `ForkDynamic` nodes don't run a task body
/// themselves; at dispatch time the engine runs their generator (registered
/// separately as a `ForkGenerator`) and expands into N child task refs of
/// `child_task_name`, per §4.11's "helper task produces `{task_defs,
/// inputs}`" contract.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Task(TaskDef),
    ForkDynamic { child_task_def: TaskDef },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub task_ref: String,
    pub kind: NodeKind,
    pub parents: Vec<String>,
}

/// A DAG shape: a fixed set of named nodes plus their parent edges. Built
/// once per workflow kind (e.g. the multitrack pipeline from §4.11) and
/// reused across runs; dynamic fan-out nodes expand into fresh task rows at
/// run time rather than being baked into the shape.
#[derive(Debug, Clone, Default)]
pub struct DagDef {
    pub name: String,
    pub nodes: Vec<Node>,
}

pub struct DagBuilder {
    dag: DagDef,
}

impl DagBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            dag: DagDef {
                name: name.into(),
                nodes: Vec::new(),
            },
        }
    }

    pub fn task(mut self, task_ref: &str, def: TaskDef, parents: &[&str]) -> Self {
        self.dag.nodes.push(Node {
            task_ref: task_ref.to_string(),
            kind: NodeKind::Task(def),
            parents: parents.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn fork_dynamic(mut self, task_ref: &str, child_task_def: TaskDef, parents: &[&str]) -> Self {
        self.dag.nodes.push(Node {
            task_ref: task_ref.to_string(),
            kind: NodeKind::ForkDynamic { child_task_def },
            parents: parents.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> DagDef {
        self.dag
    }
}

impl DagDef {
    pub fn node(&self, task_ref: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.task_ref == task_ref)
    }

    /// Kahn's algorithm, deterministic via lexicographic tie-breaking,
    /// matching the topo sort used for DAG status extraction.
    pub fn topo_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            in_degree.entry(&node.task_ref).or_insert(0);
            for parent in &node.parents {
                *in_degree.entry(&node.task_ref).or_insert(0) += 1;
                children.entry(parent.as_str()).or_default().push(&node.task_ref);
            }
        }

        let mut ready: BTreeMap<&str, ()> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(k, _)| (*k, ()))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some((&node, _)) = ready.iter().next() {
            ready.remove(node);
            result.push(node.to_string());
            if let Some(kids) = children.get(node) {
                for &child in kids {
                    let deg = in_degree.get_mut(child).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(child, ());
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> TaskDef {
        TaskDef::new(name, 60, 30, 3)
    }

    #[test]
    fn topo_order_respects_dependencies() {
        let dag = DagBuilder::new("test")
            .task("a", def("a"), &[])
            .task("b", def("b"), &["a"])
            .task("c", def("c"), &["a"])
            .task("d", def("d"), &["b", "c"])
            .build();

        let order = dag.topo_order();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }
}
