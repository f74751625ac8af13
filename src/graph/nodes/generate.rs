// Generate Nodes
// Draft a reply, then rank the evidence it was built from

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::state::{DocumentField, PipelineState};
use crate::llm::prompt;
use crate::rag::history_documents;

fn contents(state: &PipelineState, field: DocumentField) -> String {
    prompt::join_documents(state.documents(field).iter().map(|d| d.content.as_str()))
}

/// Style-mimicking reply from the retrieved `context`.
pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        let context = contents(&state, DocumentField::Context);
        if context.is_empty() {
            tracing::info!("No past emails retrieved; drafting a generic reply");
        }

        let completion = ctx
            .generator
            .complete(prompt::style_reply(&context, &state.question))
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;
        let answer = completion.text.trim().to_string();

        let similarities = ctx
            .scorer
            .score(&answer, state.documents(DocumentField::Context))
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;

        Ok(state.with_answer(answer, similarities))
    }
}

/// Fact-grounded raw reply from the Q&A `dataset` and the history.
pub struct GenerateRawNode;

impl GenerateRawNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateRawNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateRawNode {
    fn id(&self) -> &'static str {
        "generate_raw"
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        let dataset = contents(&state, DocumentField::Dataset);
        let history = history_documents(&state.history, state.session.as_ref());
        let request = prompt::grounded_reply(&dataset, &history, &state.question);

        let completion = ctx
            .generator
            .complete(request)
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;
        let answer = completion.text.trim().to_string();

        let similarities = ctx
            .scorer
            .score(&answer, state.documents(DocumentField::Dataset))
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;

        Ok(state.with_answer(answer, similarities))
    }
}
