//! Graph builder, compile-time validation and the sequential walker.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::error::WorkflowError;
use super::node::Node;
use super::state::GraphState;

/// Terminal marker for edges.
pub const END: &str = "__end__";

type Router<S> = Arc<dyn Fn(&S) -> &'static str + Send + Sync>;

enum Edge<S> {
    Direct(String),
    Conditional { router: Router<S>, targets: Vec<String> },
}

impl<S> Edge<S> {
    fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Direct(target) => vec![target.as_str()],
            Edge::Conditional { targets, .. } => targets.iter().map(String::as_str).collect(),
        }
    }
}

/// Collects nodes and edges; [`compile`](GraphBuilder::compile) validates them.
pub struct GraphBuilder<S: GraphState> {
    name: String,
    nodes: Vec<Arc<dyn Node<S>>>,
    entries: Vec<String>,
    edges: Vec<(String, Edge<S>)>,
}

impl<S: GraphState> GraphBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            entries: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(mut self, node: impl Node<S> + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    pub fn set_entry(mut self, name: impl Into<String>) -> Self {
        self.entries.push(name.into());
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// Route from `from` to whichever of `targets` the router names.
    pub fn add_conditional_edges<F>(mut self, from: impl Into<String>, router: F, targets: &[&str]) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
    {
        self.edges.push((
            from.into(),
            Edge::Conditional {
                router: Arc::new(router),
                targets: targets.iter().map(|t| t.to_string()).collect(),
            },
        ));
        self
    }

    pub fn compile(self) -> Result<WorkflowGraph<S>, WorkflowError> {
        let graph = self.name.as_str();

        if self.nodes.is_empty() {
            return Err(WorkflowError::invalid(graph, "graph has no nodes"));
        }

        let mut nodes: HashMap<String, Arc<dyn Node<S>>> = HashMap::new();
        for node in self.nodes {
            let name = node.name().to_string();
            if name == END {
                return Err(WorkflowError::invalid(graph, format!("node name {} is reserved", END)));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(WorkflowError::invalid(graph, format!("duplicate node {}", name)));
            }
        }

        let entry = match self.entries.as_slice() {
            [entry] => entry.clone(),
            [] => return Err(WorkflowError::invalid(graph, "no entry node")),
            _ => return Err(WorkflowError::invalid(graph, "more than one entry node")),
        };
        if !nodes.contains_key(&entry) {
            return Err(WorkflowError::invalid(graph, format!("entry {} is not a node", entry)));
        }

        let mut edges: HashMap<String, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if !nodes.contains_key(&from) {
                return Err(WorkflowError::invalid(graph, format!("edge from unknown node {}", from)));
            }
            let targets = edge.targets();
            if targets.is_empty() {
                return Err(WorkflowError::invalid(graph, format!("router after {} has no targets", from)));
            }
            if let Some(unknown) = targets.iter().find(|t| **t != END && !nodes.contains_key(**t)) {
                return Err(WorkflowError::invalid(
                    graph,
                    format!("edge from {} to unknown node {}", from, unknown),
                ));
            }
            if edges.contains_key(&from) {
                return Err(WorkflowError::invalid(graph, format!("node {} has more than one outgoing edge", from)));
            }
            edges.insert(from, edge);
        }

        if let Some(dangling) = nodes.keys().find(|name| !edges.contains_key(*name)) {
            return Err(WorkflowError::invalid(graph, format!("node {} has no outgoing edge", dangling)));
        }

        // Every node reachable from the entry
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut stack = vec![entry.as_str()];
        while let Some(name) = stack.pop() {
            if name == END || !reachable.insert(name) {
                continue;
            }
            if let Some(edge) = edges.get(name) {
                stack.extend(edge.targets());
            }
        }
        if let Some(unreachable) = nodes.keys().find(|name| !reachable.contains(name.as_str())) {
            return Err(WorkflowError::invalid(graph, format!("node {} is unreachable", unreachable)));
        }

        // No cycles, so every walk ends at END
        if let Some(node) = find_cycle(&entry, &edges) {
            return Err(WorkflowError::invalid(graph, format!("cycle through node {}", node)));
        }

        Ok(WorkflowGraph {
            name: self.name,
            nodes,
            entry,
            edges,
        })
    }
}

fn find_cycle<S>(entry: &str, edges: &HashMap<String, Edge<S>>) -> Option<String> {
    fn visit<'a, S>(
        name: &'a str,
        edges: &'a HashMap<String, Edge<S>>,
        on_path: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<String> {
        if name == END || done.contains(name) {
            return None;
        }
        if !on_path.insert(name) {
            return Some(name.to_string());
        }
        if let Some(edge) = edges.get(name) {
            for target in edge.targets() {
                if let Some(node) = visit(target, edges, on_path, done) {
                    return Some(node);
                }
            }
        }
        on_path.remove(name);
        done.insert(name);
        None
    }

    visit(entry, edges, &mut HashSet::new(), &mut HashSet::new())
}

/// A validated graph, ready to run any number of times.
pub struct WorkflowGraph<S: GraphState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    entry: String,
    edges: HashMap<String, Edge<S>>,
}

impl<S: GraphState> std::fmt::Debug for WorkflowGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes: Vec<&String> = self.nodes.keys().collect();
        nodes.sort();
        f.debug_struct("WorkflowGraph")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &nodes)
            .finish()
    }
}

impl<S: GraphState> WorkflowGraph<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Walk from the entry to END, merging each node's patch into the state.
    ///
    /// The first failing node aborts the walk.
    pub async fn run(&self, initial: S) -> Result<S, WorkflowError> {
        let mut state = initial;
        let mut current = self.entry.clone();

        loop {
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::invalid(&self.name, format!("unknown node {}", current)))?;

            debug!(graph = %self.name, node = %current, "running node");
            let patch = node
                .execute(&state)
                .await
                .map_err(|source| WorkflowError::NodeFailed {
                    graph: self.name.clone(),
                    node: current.clone(),
                    source,
                })?;
            state = state.merge(patch);

            let edge = self
                .edges
                .get(&current)
                .ok_or_else(|| WorkflowError::invalid(&self.name, format!("node {} has no outgoing edge", current)))?;

            let next = match edge {
                Edge::Direct(target) => target.clone(),
                Edge::Conditional { router, targets } => {
                    let choice = router(&state);
                    if !targets.iter().any(|t| t == choice) {
                        return Err(WorkflowError::InvalidRoute {
                            node: current,
                            target: choice.to_string(),
                        });
                    }
                    debug!(graph = %self.name, from = %current, to = choice, "routed");
                    choice.to_string()
                }
            };

            if next == END {
                return Ok(state);
            }
            current = next;
        }
    }
}
