//! Corpus ingestion: split, embed and upsert documents into a namespace.
//!
//! Embedding runs with a bounded number of requests in flight and keeps
//! input order, so record ids and sequence indexes line up with the source.

use std::sync::{Arc, OnceLock};

use futures_util::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::store::{DocumentMetadata, RetrievedDocument, Session, Source, VectorRecord, VectorStore};
use crate::llm::{EmbeddingGateway, ServiceError};

const SUBJECT_MARKER: &str = "Subject: ";

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// One question/answer pair of a knowledge-base dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub question: String,
    pub answer: String,
}

impl DatasetEntry {
    pub fn render(&self) -> String {
        format!("Question: {}\nAnswer: {}", self.question.trim(), self.answer.trim())
    }
}

/// Split a plain-text mailbox export into one section per `Subject: ` header.
///
/// Whitespace runs are collapsed first, so sections come back single-line.
pub fn split_email_corpus(text: &str) -> Vec<String> {
    let single_line = whitespace_re().replace_all(text, " ");
    let single_line = single_line.trim();

    let mut sections = Vec::new();
    let mut start = 0;
    for (pos, _) in single_line.match_indices(SUBJECT_MARKER) {
        if pos > start {
            sections.push(single_line[start..pos].trim().to_string());
        }
        start = pos;
    }
    sections.push(single_line[start..].trim().to_string());

    sections.retain(|s| !s.is_empty());
    sections
}

fn metadata(source: Source, session: Option<&Session>, idx: usize) -> DocumentMetadata {
    DocumentMetadata {
        source,
        session_id: session.map(|s| s.id().to_string()),
        sequence_index: idx,
    }
}

pub fn documents_from_corpus(text: &str, session: Option<&Session>) -> Vec<RetrievedDocument> {
    split_email_corpus(text)
        .into_iter()
        .enumerate()
        .map(|(idx, section)| {
            RetrievedDocument::new(section, metadata(Source::EmailSample, session, idx))
        })
        .collect()
}

/// One document per email; blank emails are skipped but keep their index slot.
pub fn documents_from_emails(
    emails: &[String],
    source: Source,
    session: Option<&Session>,
) -> Vec<RetrievedDocument> {
    emails
        .iter()
        .enumerate()
        .filter(|(_, email)| !email.trim().is_empty())
        .map(|(idx, email)| RetrievedDocument::new(email.trim(), metadata(source, session, idx)))
        .collect()
}

pub fn documents_from_dataset(
    entries: &[DatasetEntry],
    session: Option<&Session>,
) -> Vec<RetrievedDocument> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.question.trim().is_empty() || !entry.answer.trim().is_empty())
        .map(|(idx, entry)| RetrievedDocument::new(entry.render(), metadata(Source::Dataset, session, idx)))
        .collect()
}

pub fn history_documents(history: &[String], session: Option<&Session>) -> Vec<RetrievedDocument> {
    documents_from_emails(history, Source::ConversationHistory, session)
}

/// Deterministic id so re-ingesting the same text overwrites instead of duplicating.
pub fn record_id(namespace: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update([0x1f]);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingGateway>,
    store: Arc<dyn VectorStore>,
    max_concurrency: usize,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        store: Arc<dyn VectorStore>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Embed and upsert `documents` into `namespace`. Returns the number written.
    pub async fn ingest(
        &self,
        namespace: &str,
        documents: Vec<RetrievedDocument>,
    ) -> Result<usize, ServiceError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let total = documents.len();
        let pending: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let embedder = self.embedder.clone();
                async move {
                    let values = embedder.embed(&document.content).await?;
                    Ok::<_, ServiceError>(VectorRecord {
                        id: record_id(namespace, &document.content),
                        values,
                        document,
                    })
                }
            })
            .collect();
        let records: Vec<VectorRecord> = stream::iter(pending)
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let written = self.store.upsert(namespace, records).await?;
        tracing::info!(
            "Ingested {}/{} documents into namespace '{}' ({})",
            written,
            total,
            namespace,
            self.store.name()
        );
        Ok(written)
    }
}
