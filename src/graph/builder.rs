// Graph Builder
// Constructs the drafting pipelines using petgraph

use super::node::GraphError;
use super::nodes::{GenerateNode, GenerateRawNode, RefineNode, RetrieveNode};
use super::runtime::{GraphBuilder, GraphRuntime, END, START};
use super::state::PipelineVariant;

/// retrieve -> generate
pub fn build_two_stage_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new(PipelineVariant::TwoStage.as_str())
        .node(Box::new(RetrieveNode::context()))
        .node(Box::new(GenerateNode::new()))
        .edge(START, "retrieve")
        .edge("retrieve", "generate")
        .edge("generate", END)
        .compile()
}

/// dataset_retrieve -> generate_raw -> reference_emails_retrieve -> refine
pub fn build_four_stage_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new(PipelineVariant::FourStage.as_str())
        .node(Box::new(RetrieveNode::dataset()))
        .node(Box::new(GenerateRawNode::new()))
        .node(Box::new(RetrieveNode::reference_emails()))
        .node(Box::new(RefineNode::new()))
        .edge(START, "dataset_retrieve")
        .edge("dataset_retrieve", "generate_raw")
        .edge("generate_raw", "reference_emails_retrieve")
        .edge("reference_emails_retrieve", "refine")
        .edge("refine", END)
        .compile()
}

pub fn build_graph(variant: PipelineVariant) -> Result<GraphRuntime, GraphError> {
    match variant {
        PipelineVariant::TwoStage => build_two_stage_graph(),
        PipelineVariant::FourStage => build_four_stage_graph(),
    }
}
