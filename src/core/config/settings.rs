//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty `config.yml` yields a working
//! local setup (apart from API keys, which come from secrets or env).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub vector_store: VectorStoreConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimension: 3072,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<i32>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4-turbo".to_string(),
            temperature: 0.3,
            max_tokens: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    /// Data-plane host of the index, e.g. `https://sentemail-xxxx.svc.pinecone.io`.
    pub index_host: Option<String>,
    pub api_key: Option<String>,
    /// Namespace used when a request carries no session.
    pub default_namespace: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub max_embedding_concurrency: usize,
    /// Embed all scored documents in one request instead of one call each.
    pub batch_scoring_embeddings: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_embedding_concurrency: 8,
            batch_scoring_embeddings: false,
        }
    }
}
