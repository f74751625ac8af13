// Graph Runtime - petgraph based
// Compiles a declared stage graph into its single start-to-end path

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext};
use super::state::PipelineState;

/// Entry sentinel
pub const START: &str = "__start__";
/// Exit sentinel
pub const END: &str = "__end__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vertex {
    Start,
    End,
    /// Index into the builder's stage list
    Stage(usize),
}

/// Builder for declaring a stage graph fluently
pub struct GraphBuilder {
    name: String,
    graph: DiGraph<Vertex, ()>,
    node_indices: HashMap<String, NodeIndex>,
    stages: Vec<Box<dyn Node>>,
    pending_edges: Vec<(String, String)>,
    duplicates: Vec<String>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        node_indices.insert(START.to_string(), graph.add_node(Vertex::Start));
        node_indices.insert(END.to_string(), graph.add_node(Vertex::End));

        Self {
            name: name.into(),
            graph,
            node_indices,
            stages: Vec::new(),
            pending_edges: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        let id = node.id().to_string();
        if self.node_indices.contains_key(&id) {
            self.duplicates.push(id);
            return self;
        }
        let index = self.graph.add_node(Vertex::Stage(self.stages.len()));
        self.stages.push(node);
        self.node_indices.insert(id, index);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges.push((from.into(), to.into()));
        self
    }

    /// Validate the topology and fix the execution order.
    ///
    /// The declared edges must form exactly one acyclic path from `START`
    /// to `END` that visits every stage.
    pub fn compile(mut self) -> Result<GraphRuntime, GraphError> {
        if let Some(id) = self.duplicates.first() {
            return Err(GraphError::compile(format!("Duplicate node: {}", id)));
        }

        for (from, to) in &self.pending_edges {
            let from_idx = self
                .node_indices
                .get(from)
                .ok_or_else(|| GraphError::compile(format!("Source node not found: {}", from)))?;
            let to_idx = self
                .node_indices
                .get(to)
                .ok_or_else(|| GraphError::compile(format!("Target node not found: {}", to)))?;
            self.graph.add_edge(*from_idx, *to_idx, ());
        }

        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(GraphError::compile(format!(
                "Graph '{}' contains a cycle",
                self.name
            )));
        }

        let path = self.linear_path()?;
        if path.len() != self.stages.len() {
            let stray: Vec<&str> = self
                .stages
                .iter()
                .enumerate()
                .filter(|(idx, _)| !path.contains(idx))
                .map(|(_, stage)| stage.id())
                .collect();
            return Err(GraphError::compile(format!(
                "Stages not reachable from {}: {}",
                START,
                stray.join(", ")
            )));
        }

        let mut slots: Vec<Option<Box<dyn Node>>> = self.stages.into_iter().map(Some).collect();
        let stages = path
            .into_iter()
            .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
            .collect();

        Ok(GraphRuntime {
            name: self.name,
            stages,
        })
    }

    /// Follow single outgoing edges from `START`; returns stage indexes in order.
    fn linear_path(&self) -> Result<Vec<usize>, GraphError> {
        let mut path = Vec::new();
        let mut current = self.node_indices[START];

        loop {
            let mut outgoing = self.graph.neighbors_directed(current, Direction::Outgoing);
            let next = outgoing.next();
            if outgoing.next().is_some() {
                return Err(GraphError::compile(format!(
                    "Node '{}' branches; only linear pipelines are supported",
                    self.label(current)
                )));
            }

            let Some(next) = next else {
                return Err(GraphError::compile(format!(
                    "No path from {} to {}: '{}' has no outgoing edge",
                    START,
                    END,
                    self.label(current)
                )));
            };

            match self.graph[next] {
                Vertex::End => return Ok(path),
                Vertex::Stage(idx) => path.push(idx),
                Vertex::Start => {
                    return Err(GraphError::compile(format!("Edge into {}", START)));
                }
            }
            current = next;
        }
    }

    fn label(&self, index: NodeIndex) -> &str {
        match self.graph[index] {
            Vertex::Start => START,
            Vertex::End => END,
            Vertex::Stage(idx) => self.stages[idx].id(),
        }
    }
}

/// A compiled pipeline: stages in the only order they may run
pub struct GraphRuntime {
    name: String,
    stages: Vec<Box<dyn Node>>,
}

impl std::fmt::Debug for GraphRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRuntime")
            .field("name", &self.name)
            .field("stages", &self.stage_ids())
            .finish()
    }
}

impl GraphRuntime {
    pub fn stage_ids(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.id()).collect()
    }

    /// Execute every stage in order, threading the state forward.
    pub async fn run(
        &self,
        initial: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        let mut state = initial;
        let mut trace: Vec<&'static str> = Vec::with_capacity(self.stages.len());

        for (step, stage) in self.stages.iter().enumerate() {
            let node_id = stage.id();
            trace.push(node_id);
            tracing::debug!("[{}] Executing node: {} (step {})", self.name, node_id, step);

            state = match stage.execute(state, ctx).await {
                Ok(next) => next,
                Err(err) => {
                    let err = trace
                        .iter()
                        .fold(err, |err, visited| err.with_trace_entry(*visited));
                    tracing::error!("[{}] {}", self.name, err);
                    return Err(err);
                }
            };
        }

        tracing::debug!("[{}] Graph execution complete", self.name);
        Ok(state)
    }
}
