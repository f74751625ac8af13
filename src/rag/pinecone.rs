//! Pinecone data-plane implementation of `VectorStore`.
//!
//! Talks to an existing index host over REST. Index creation and
//! configuration are done outside this service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::store::{DocumentMetadata, RetrievedDocument, Source, VectorRecord, VectorStore};
use crate::core::config::VectorStoreConfig;
use crate::llm::{EmbeddingGateway, ServiceError};

const SERVICE: &str = "pinecone";
const API_VERSION: &str = "2024-07";
const UPSERT_BATCH_SIZE: usize = 100;

/// Metadata key holding the document text (LangChain-compatible).
const TEXT_KEY: &str = "text";

pub struct PineconeStore {
    host: String,
    api_key: String,
    default_namespace: Option<String>,
    client: Client,
    embedder: Arc<dyn EmbeddingGateway>,
}

impl PineconeStore {
    pub fn new(
        config: &VectorStoreConfig,
        embedder: Arc<dyn EmbeddingGateway>,
    ) -> Result<Self, ServiceError> {
        let host = config
            .index_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::config(SERVICE, "vector_store.index_host (or PINECONE_INDEX_HOST) is required")
            })?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::config(SERVICE, "vector_store.api_key (or PINECONE_API_KEY) is required")
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(30)))
            .build()
            .map_err(|e| ServiceError::config(SERVICE, e.to_string()))?;

        Ok(Self {
            host: normalize_host(host),
            api_key,
            default_namespace: config.default_namespace.clone(),
            client,
            embedder,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        let url = format!("{}{}", self.host, path);
        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let text = res
            .text()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&text).map_err(|e| ServiceError::decode(SERVICE, e.to_string()))
    }

    fn resolve_namespace<'a>(&'a self, namespace: Option<&'a str>) -> &'a str {
        namespace
            .or(self.default_namespace.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>, ServiceError> {
        let vector = self.embedder.embed(query).await?;
        let body = json!({
            "namespace": self.resolve_namespace(namespace),
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });

        let payload = self.post("/query", &body).await?;
        let response: QueryResponse = serde_json::from_value(payload)
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;

        Ok(response
            .matches
            .into_iter()
            .filter_map(|m| m.metadata.map(|meta| document_from_metadata(&meta)))
            .collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, ServiceError> {
        let mut written = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let vectors: Vec<UpsertVector<'_>> = batch
                .iter()
                .map(|record| UpsertVector {
                    id: &record.id,
                    values: &record.values,
                    metadata: metadata_for_document(&record.document),
                })
                .collect();
            let body = json!({ "namespace": namespace, "vectors": vectors });
            let payload = self.post("/vectors/upsert", &body).await?;
            let response: UpsertResponse = serde_json::from_value(payload)
                .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
            written += response.upserted_count;
        }
        Ok(written)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ServiceError> {
        let body = json!({ "namespace": namespace, "deleteAll": true });
        match self.post("/vectors/delete", &body).await {
            Ok(_) => Ok(()),
            // Pinecone answers 404 for a namespace that was never written.
            Err(ServiceError::Status { status: 404, .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn metadata_for_document(document: &RetrievedDocument) -> Value {
    let mut metadata = json!({
        TEXT_KEY: document.content,
        "source": document.metadata.source.as_str(),
        "sequenceIndex": document.metadata.sequence_index,
    });
    if let (Some(obj), Some(session)) = (metadata.as_object_mut(), &document.metadata.session_id) {
        obj.insert("sessionId".to_string(), json!(session));
    }
    metadata
}

fn document_from_metadata(metadata: &Map<String, Value>) -> RetrievedDocument {
    let content = metadata
        .get(TEXT_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let source = metadata
        .get("source")
        .and_then(|v| v.as_str())
        .map(Source::parse)
        .unwrap_or_default();
    let sequence_index = metadata
        .get("sequenceIndex")
        .or_else(|| metadata.get("emailIndex"))
        .and_then(|v| v.as_f64())
        .map(|v| v as usize)
        .unwrap_or(0);
    let session_id = metadata
        .get("sessionId")
        .and_then(|v| v.as_str())
        .map(String::from);

    RetrievedDocument::new(
        content,
        DocumentMetadata {
            source,
            session_id,
            sequence_index,
        },
    )
}
