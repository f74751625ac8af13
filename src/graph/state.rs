// Pipeline State
// Record threaded through the drafting stages by functional update

use serde::{Deserialize, Serialize};

use crate::rag::{RetrievedDocument, Session};
use crate::scoring::ScoredDocument;

/// Which retrieval slot of the state a stage reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentField {
    Context,
    Dataset,
    ReferenceEmails,
}

impl DocumentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentField::Context => "context",
            DocumentField::Dataset => "dataset",
            DocumentField::ReferenceEmails => "referenceEmails",
        }
    }
}

/// Pipeline topologies
///
/// - `TwoStage`: retrieve -> generate
/// - `FourStage`: dataset_retrieve -> generate_raw -> reference_emails_retrieve -> refine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    #[default]
    TwoStage,
    FourStage,
}

impl PipelineVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVariant::TwoStage => "two_stage",
            PipelineVariant::FourStage => "four_stage",
        }
    }

    /// Whether runs of this variant need a session to scope retrieval.
    pub fn requires_session(&self) -> bool {
        matches!(self, PipelineVariant::FourStage)
    }
}

/// Accumulated pipeline state.
///
/// Stages never mutate a state in place: each `with_*` call consumes the
/// state and returns the updated value. Retrieval slots and `similarities`
/// are `None` until the stage that owns them has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub session: Option<Session>,
    pub question: String,
    pub history: Vec<String>,
    pub context: Option<Vec<RetrievedDocument>>,
    pub dataset: Option<Vec<RetrievedDocument>>,
    pub reference_emails: Option<Vec<RetrievedDocument>>,
    pub answer: Option<String>,
    pub similarities: Option<Vec<ScoredDocument>>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_session(self, session: Option<Session>) -> Self {
        Self { session, ..self }
    }

    pub fn with_history(self, history: Vec<String>) -> Self {
        Self { history, ..self }
    }

    pub fn with_documents(self, field: DocumentField, documents: Vec<RetrievedDocument>) -> Self {
        match field {
            DocumentField::Context => Self {
                context: Some(documents),
                ..self
            },
            DocumentField::Dataset => Self {
                dataset: Some(documents),
                ..self
            },
            DocumentField::ReferenceEmails => Self {
                reference_emails: Some(documents),
                ..self
            },
        }
    }

    /// Overwrites the answer and its ranking together.
    pub fn with_answer(
        self,
        answer: impl Into<String>,
        similarities: Option<Vec<ScoredDocument>>,
    ) -> Self {
        Self {
            answer: Some(answer.into()),
            similarities,
            ..self
        }
    }

    /// Documents in `field`, empty if that slot was never filled.
    pub fn documents(&self, field: DocumentField) -> &[RetrievedDocument] {
        let slot = match field {
            DocumentField::Context => &self.context,
            DocumentField::Dataset => &self.dataset,
            DocumentField::ReferenceEmails => &self.reference_emails,
        };
        slot.as_deref().unwrap_or_default()
    }

    pub fn has_documents(&self, field: DocumentField) -> bool {
        match field {
            DocumentField::Context => self.context.is_some(),
            DocumentField::Dataset => self.dataset.is_some(),
            DocumentField::ReferenceEmails => self.reference_emails.is_some(),
        }
    }
}
