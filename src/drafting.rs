//! Caller-facing entry point of the drafting pipelines.
//!
//! `DraftingService` owns the long-lived gateways and the compiled graphs,
//! validates requests, runs a pipeline variant and shapes the
//! `{answer, similarity}` response. It also fronts corpus ingestion and
//! session cleanup so the HTTP layer never touches the stores directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::PipelineConfig;
use crate::core::errors::ApiError;
use crate::graph::{
    build_four_stage_graph, build_two_stage_graph, GraphError, GraphRuntime, NodeContext,
    PipelineState, PipelineVariant,
};
use crate::llm::{EmbeddingGateway, GenerationGateway, ServiceError};
use crate::rag::ingest::{documents_from_corpus, documents_from_dataset, documents_from_emails};
use crate::rag::{DatasetEntry, Ingestor, Session, Source, VectorStore};
use crate::scoring::{top_similarity, ScorerConfig, SimilarityScorer};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0}")]
    MalformedInput(String),
    #[error(transparent)]
    Pipeline(#[from] GraphError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::MalformedInput(msg) => ApiError::BadRequest(msg),
            DraftError::Pipeline(err) => err.into(),
            DraftError::Service(err) => err.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub variant: PipelineVariant,
    pub question: String,
    pub history: Vec<String>,
    pub session: Option<Session>,
}

impl DraftRequest {
    pub fn two_stage(question: impl Into<String>, session: Option<Session>) -> Self {
        Self {
            variant: PipelineVariant::TwoStage,
            question: question.into(),
            history: Vec::new(),
            session,
        }
    }

    pub fn four_stage(question: impl Into<String>, history: Vec<String>, session: Session) -> Self {
        Self {
            variant: PipelineVariant::FourStage,
            question: question.into(),
            history,
            session: Some(session),
        }
    }
}

/// `similarity` is the best weighted score, `null` when nothing was retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResponse {
    pub answer: String,
    pub similarity: Option<f32>,
}

impl DraftResponse {
    fn from_state(state: &PipelineState) -> Self {
        Self {
            answer: state.answer.clone().unwrap_or_default(),
            similarity: top_similarity(state.similarities.as_deref()),
        }
    }
}

pub struct DraftingService {
    generator: Arc<dyn GenerationGateway>,
    store: Arc<dyn VectorStore>,
    scorer: SimilarityScorer,
    ingestor: Ingestor,
    default_namespace: String,
    top_k: usize,
    two_stage: GraphRuntime,
    four_stage: GraphRuntime,
}

impl DraftingService {
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn GenerationGateway>,
        store: Arc<dyn VectorStore>,
        pipeline: &PipelineConfig,
        default_namespace: Option<String>,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            scorer: SimilarityScorer::new(embedder.clone(), ScorerConfig::from(pipeline)),
            ingestor: Ingestor::new(embedder, store.clone(), pipeline.max_embedding_concurrency),
            generator,
            store,
            default_namespace: default_namespace.unwrap_or_default(),
            top_k: pipeline.top_k.max(1),
            two_stage: build_two_stage_graph()?,
            four_stage: build_four_stage_graph()?,
        })
    }

    pub fn graph(&self, variant: PipelineVariant) -> &GraphRuntime {
        match variant {
            PipelineVariant::TwoStage => &self.two_stage,
            PipelineVariant::FourStage => &self.four_stage,
        }
    }

    pub async fn draft(&self, request: DraftRequest) -> Result<DraftResponse, DraftError> {
        let state = self.run(request).await?;
        Ok(DraftResponse::from_state(&state))
    }

    /// Run a variant and return the whole final state.
    pub async fn run(&self, request: DraftRequest) -> Result<PipelineState, DraftError> {
        if request.question.trim().is_empty() {
            return Err(DraftError::MalformedInput("question is required".to_string()));
        }
        if request.variant.requires_session() && request.session.is_none() {
            return Err(DraftError::MalformedInput(format!(
                "a session is required for the {} pipeline",
                request.variant.as_str()
            )));
        }

        let ctx = NodeContext {
            generator: self.generator.as_ref(),
            store: self.store.as_ref(),
            scorer: &self.scorer,
            top_k: self.top_k,
        };
        let initial = PipelineState::new(request.question)
            .with_session(request.session)
            .with_history(request.history);

        tracing::info!("Running {} pipeline", request.variant.as_str());
        Ok(self.graph(request.variant).run(initial, &ctx).await?)
    }

    /// Ingest the caller's emails, then draft a reply to `email` from them.
    pub async fn process_emails(
        &self,
        email: &str,
        user_emails: &[String],
        session: Option<Session>,
    ) -> Result<DraftResponse, DraftError> {
        if email.trim().is_empty() {
            return Err(DraftError::MalformedInput("email is required".to_string()));
        }
        tracing::info!("Emails for training: {}", user_emails.len());

        let namespace = session
            .as_ref()
            .map(|s| s.reference_namespace())
            .unwrap_or_else(|| self.default_namespace.clone());
        let documents = documents_from_emails(user_emails, Source::UserRequest, session.as_ref());
        self.ingestor.ingest(&namespace, documents).await?;

        self.draft(DraftRequest::two_stage(email, session)).await
    }

    pub async fn ingest_reference_emails(
        &self,
        session: &Session,
        emails: &[String],
    ) -> Result<usize, DraftError> {
        let documents = documents_from_emails(emails, Source::WritingStyle, Some(session));
        Ok(self
            .ingestor
            .ingest(&session.reference_namespace(), documents)
            .await?)
    }

    /// Split a mailbox export on `Subject: ` headers and ingest each email.
    ///
    /// Without a session the sections land in the default namespace.
    pub async fn ingest_corpus(
        &self,
        session: Option<&Session>,
        text: &str,
    ) -> Result<usize, DraftError> {
        let namespace = session
            .map(|s| s.reference_namespace())
            .unwrap_or_else(|| self.default_namespace.clone());
        let documents = documents_from_corpus(text, session);
        if documents.is_empty() {
            return Err(DraftError::MalformedInput("corpus contains no emails".to_string()));
        }
        Ok(self.ingestor.ingest(&namespace, documents).await?)
    }

    pub async fn ingest_dataset(
        &self,
        session: &Session,
        entries: &[DatasetEntry],
    ) -> Result<usize, DraftError> {
        let documents = documents_from_dataset(entries, Some(session));
        Ok(self
            .ingestor
            .ingest(&session.dataset_namespace(), documents)
            .await?)
    }

    /// Drop both namespaces of a session.
    pub async fn delete_session(&self, session: &Session) -> Result<(), DraftError> {
        for namespace in session.namespaces() {
            self.store.delete_namespace(&namespace).await?;
        }
        tracing::info!("Deleted session {}", session);
        Ok(())
    }
}
