//! In-process vector store.
//!
//! Brute-force cosine search over namespaced records held in memory.
//! Used for local development and as the store behind the test suites.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{RetrievedDocument, VectorRecord, VectorStore};
use crate::llm::{EmbeddingGateway, ServiceError};
use crate::vector_math::rank_descending_by_cosine;

const DEFAULT_NAMESPACE: &str = "";

pub struct MemoryVectorStore {
    embedder: Arc<dyn EmbeddingGateway>,
    default_namespace: String,
    namespaces: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingGateway>) -> Self {
        Self {
            embedder,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Namespace searched when the caller passes none.
    pub fn with_default_namespace(mut self, namespace: Option<String>) -> Self {
        self.default_namespace = namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        self
    }

    pub async fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>, ServiceError> {
        let namespace = namespace.unwrap_or(self.default_namespace.as_str());
        let query_embedding = self.embedder.embed(query).await?;

        let namespaces = self.namespaces.read().await;
        let Some(records) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let candidates: Vec<Vec<f32>> = records.iter().map(|r| r.values.clone()).collect();
        let ranking = rank_descending_by_cosine(&query_embedding, &candidates)
            .map_err(|e| ServiceError::decode("memory", e.to_string()))?;

        Ok(ranking
            .into_iter()
            .take(top_k)
            .filter_map(|(idx, _)| records.get(idx).map(|r| r.document.clone()))
            .collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, ServiceError> {
        let written = records.len();
        let mut namespaces = self.namespaces.write().await;
        let existing = namespaces.entry(namespace.to_string()).or_default();

        for record in records {
            match existing.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record,
                None => existing.push(record),
            }
        }

        Ok(written)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ServiceError> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}
