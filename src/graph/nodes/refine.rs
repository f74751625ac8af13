// Refine Node
// Re-style the raw answer with the reference emails

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::state::{DocumentField, PipelineState};
use crate::llm::prompt;

/// Adjusts tone, style and grammar of `answer` using `reference_emails`.
///
/// The new ranking is computed against `dataset`, so the reported score
/// measures how well the final reply is grounded in the source facts rather
/// than how closely it matches the reference style.
pub struct RefineNode;

impl RefineNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RefineNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RefineNode {
    fn id(&self) -> &'static str {
        "refine"
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        let Some(draft) = state.answer.as_deref() else {
            return Err(GraphError::new(self.id(), "no raw answer to refine"));
        };

        let references = prompt::join_documents(
            state
                .documents(DocumentField::ReferenceEmails)
                .iter()
                .map(|d| d.content.as_str()),
        );

        let completion = ctx
            .generator
            .complete(prompt::refine_style(&references, draft))
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;
        let answer = prompt::strip_subject_line(&completion.text);

        let similarities = ctx
            .scorer
            .score(&answer, state.documents(DocumentField::Dataset))
            .await
            .map_err(|e| GraphError::service(self.id(), e))?;

        Ok(state.with_answer(answer, similarities))
    }
}
