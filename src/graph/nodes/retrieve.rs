// Retrieve Nodes
// Similarity search for the question, written into one retrieval slot

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::state::{DocumentField, PipelineState};

/// Which namespace a retrieval stage searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalScope {
    /// The session's reference namespace, or the store default without a session.
    SessionOrDefault,
    /// The session's reference-email namespace; a session is required.
    SessionReference,
    /// The session's dataset namespace; a session is required.
    SessionDataset,
}

pub struct RetrieveNode {
    id: &'static str,
    target: DocumentField,
    scope: RetrievalScope,
}

impl RetrieveNode {
    /// Two-stage retrieval into `context`.
    pub fn context() -> Self {
        Self {
            id: "retrieve",
            target: DocumentField::Context,
            scope: RetrievalScope::SessionOrDefault,
        }
    }

    pub fn dataset() -> Self {
        Self {
            id: "dataset_retrieve",
            target: DocumentField::Dataset,
            scope: RetrievalScope::SessionDataset,
        }
    }

    pub fn reference_emails() -> Self {
        Self {
            id: "reference_emails_retrieve",
            target: DocumentField::ReferenceEmails,
            scope: RetrievalScope::SessionReference,
        }
    }

    pub fn target(&self) -> DocumentField {
        self.target
    }

    fn namespace(&self, state: &PipelineState) -> Result<Option<String>, GraphError> {
        let session = state.session.as_ref();
        match self.scope {
            RetrievalScope::SessionOrDefault => Ok(session.map(|s| s.reference_namespace())),
            RetrievalScope::SessionReference => session
                .map(|s| Some(s.reference_namespace()))
                .ok_or_else(|| GraphError::malformed(self.id, "a session is required")),
            RetrievalScope::SessionDataset => session
                .map(|s| Some(s.dataset_namespace()))
                .ok_or_else(|| GraphError::malformed(self.id, "a session is required")),
        }
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        let namespace = self.namespace(&state)?;

        let documents = ctx
            .store
            .search(&state.question, ctx.top_k, namespace.as_deref())
            .await
            .map_err(|e| GraphError::service(self.id, e))?;

        tracing::debug!(
            "Retrieved {} documents into {} (namespace: {})",
            documents.len(),
            self.target.as_str(),
            namespace.as_deref().unwrap_or("<default>")
        );

        Ok(state.with_documents(self.target, documents))
    }
}
