// Node trait and types
// Base abstraction for pipeline stages

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::{GenerationGateway, ServiceError};
use crate::rag::VectorStore;
use crate::scoring::SimilarityScorer;

use super::state::PipelineState;

/// Gateways available to stages during one run
pub struct NodeContext<'a> {
    pub generator: &'a dyn GenerationGateway,
    pub store: &'a dyn VectorStore,
    pub scorer: &'a SimilarityScorer,
    /// Documents fetched per retrieval stage.
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// An embedding, vector-store or generation call failed.
    Service,
    /// The initial state lacks something a stage needs.
    MalformedInput,
    /// The declared topology is not a single start-to-end path.
    Compile,
    Runtime,
}

/// Graph execution error
///
/// Includes an `execution_trace` recording the stage IDs visited up to and
/// including the failing one.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub kind: GraphErrorKind,
    /// Ordered list of stage IDs executed, most-recent last.
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            kind: GraphErrorKind::Runtime,
            execution_trace: Vec::new(),
        }
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::new("compile", message).with_kind(GraphErrorKind::Compile)
    }

    pub fn malformed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(node_id, message).with_kind(GraphErrorKind::MalformedInput)
    }

    pub fn service(node_id: impl Into<String>, err: ServiceError) -> Self {
        Self::new(node_id, err.to_string()).with_kind(GraphErrorKind::Service)
    }

    pub fn with_kind(mut self, kind: GraphErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_trace_entry(mut self, node_id: impl Into<String>) -> Self {
        self.execution_trace.push(node_id.into());
        self
    }
}

impl From<ServiceError> for GraphError {
    fn from(err: ServiceError) -> Self {
        let service = err.service().to_string();
        GraphError::service(service, err)
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let message = err.to_string();
        match err.kind {
            GraphErrorKind::Service => ApiError::Upstream(message),
            GraphErrorKind::MalformedInput => ApiError::BadRequest(message),
            GraphErrorKind::Compile | GraphErrorKind::Runtime => ApiError::Internal(message),
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - every pipeline stage implements this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this stage
    fn id(&self) -> &'static str;

    /// Consume the state and return the updated one.
    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn display_includes_trace() {
        let err = GraphError::new("generate", "boom")
            .with_trace_entry("retrieve")
            .with_trace_entry("generate");
        assert_eq!(
            err.to_string(),
            "GraphError in generate (trace: retrieve -> generate): boom"
        );
    }

    #[test]
    fn service_errors_keep_their_origin() {
        let err: GraphError = ServiceError::Timeout {
            service: "pinecone".to_string(),
        }
        .into();
        assert_eq!(err.kind, GraphErrorKind::Service);
        assert_eq!(err.node_id, "pinecone");
    }

    #[test]
    fn api_status_follows_kind() {
        let upstream: ApiError = GraphError::service(
            "retrieve",
            ServiceError::Timeout {
                service: "pinecone".to_string(),
            },
        )
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let bad: ApiError = GraphError::malformed("retrieve", "no session").into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let internal: ApiError = GraphError::compile("cycle").into();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
