// Drafting Graph Module
// Fixed stage pipelines compiled from a petgraph topology

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;

#[cfg(test)]
mod tests;

pub use builder::{build_four_stage_graph, build_graph, build_two_stage_graph};
pub use node::{GraphError, GraphErrorKind, Node, NodeContext};
pub use runtime::{GraphBuilder, GraphRuntime};
pub use state::{DocumentField, PipelineState, PipelineVariant};
