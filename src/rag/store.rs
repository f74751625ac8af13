//! VectorStore trait — abstract interface over namespaced similarity search.
//!
//! The drafting pipeline only consumes `search`; `upsert` and
//! `delete_namespace` exist for ingestion and session cleanup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::ServiceError;

/// Origin tag of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    #[default]
    EmailSample,
    UserRequest,
    ConversationHistory,
    WritingStyle,
    Dataset,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::EmailSample => "emailSample",
            Source::UserRequest => "userRequest",
            Source::ConversationHistory => "conversationHistory",
            Source::WritingStyle => "writingStyle",
            Source::Dataset => "dataset",
        }
    }

    /// Lenient parse for metadata written by other tools; unknown tags map to `EmailSample`.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "userRequest" => Source::UserRequest,
            "conversationHistory" => Source::ConversationHistory,
            "writingStyle" => Source::WritingStyle,
            "dataset" => Source::Dataset,
            _ => Source::EmailSample,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub source: Source,
    pub session_id: Option<String>,
    pub sequence_index: usize,
}

/// A document returned by similarity search, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A document with its embedding, ready to be written.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub document: RetrievedDocument,
}

const DATASET_SUFFIX: &str = "-dataset";

/// Caller-generated identifier isolating one user's vectors from another's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(String);

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Accept a caller-supplied id: 1-128 ASCII alphanumerics, `-` or `_`,
    /// not ending in the dataset suffix.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        let valid = !id.is_empty()
            && id.len() <= 128
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            && !id.ends_with(DATASET_SUFFIX);
        valid.then(|| Self(id.to_string()))
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// Namespace holding the session's reference emails.
    pub fn reference_namespace(&self) -> String {
        self.0.clone()
    }

    /// Namespace holding the session's Q&A dataset.
    pub fn dataset_namespace(&self) -> String {
        format!("{}{}", self.0, DATASET_SUFFIX)
    }

    pub fn namespaces(&self) -> [String; 2] {
        [self.reference_namespace(), self.dataset_namespace()]
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// Embed `query` and return up to `top_k` documents, most similar first.
    /// `None` searches the store's default namespace.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>, ServiceError>;

    /// Insert or overwrite records by id. Returns the number written.
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, ServiceError>;

    /// Drop every record in `namespace`.
    async fn delete_namespace(&self, namespace: &str) -> Result<(), ServiceError>;
}
