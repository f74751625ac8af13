use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{EmbeddingGateway, GenerationGateway};
use super::types::{ChatRequest, Completion, ServiceError};
use crate::core::config::{EmbeddingConfig, GenerationConfig};

const EMBEDDING_SERVICE: &str = "embedding";
const GENERATION_SERVICE: &str = "generation";

/// Shared HTTP plumbing for OpenAI-compatible endpoints.
#[derive(Clone)]
struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiClient {
    fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::config("http", e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    async fn post_json(&self, service: &str, path: &str, body: &Value) -> Result<Value, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: service.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|e| ServiceError::decode(service, e.to_string()))
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// `/v1/embeddings` gateway.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    http: OpenAiClient,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ServiceError> {
        if config.api_key.is_none() && config.base_url.contains("api.openai.com") {
            return Err(ServiceError::config(
                EMBEDDING_SERVICE,
                "embedding.api_key (or OPENAI_API_KEY) is required",
            ));
        }
        Ok(Self {
            http: OpenAiClient::new(
                &config.base_url,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let body = json!({
            "model": self.model,
            "input": inputs,
        });
        let payload = self
            .http
            .post_json(EMBEDDING_SERVICE, "/v1/embeddings", &body)
            .await?;
        let mut response: EmbeddingResponse = serde_json::from_value(payload)
            .map_err(|e| ServiceError::decode(EMBEDDING_SERVICE, e.to_string()))?;

        if response.data.len() != inputs.len() {
            return Err(ServiceError::decode(
                EMBEDDING_SERVICE,
                format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    response.data.len()
                ),
            ));
        }

        response.data.sort_by_key(|item| item.index);
        let mut vectors = Vec::with_capacity(response.data.len());
        for item in response.data {
            if item.embedding.len() != self.dimension {
                return Err(ServiceError::decode(
                    EMBEDDING_SERVICE,
                    format!(
                        "expected dimension {}, got {}",
                        self.dimension,
                        item.embedding.len()
                    ),
                ));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingGateway for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ServiceError::decode(EMBEDDING_SERVICE, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

/// `/v1/chat/completions` gateway.
#[derive(Clone)]
pub struct OpenAiChat {
    http: OpenAiClient,
    model: String,
    temperature: f64,
    max_tokens: Option<i32>,
}

impl OpenAiChat {
    pub fn new(config: &GenerationConfig) -> Result<Self, ServiceError> {
        if config.api_key.is_none() && config.base_url.contains("api.openai.com") {
            return Err(ServiceError::config(
                GENERATION_SERVICE,
                "generation.api_key (or OPENAI_API_KEY) is required",
            ));
        }
        Ok(Self {
            http: OpenAiClient::new(
                &config.base_url,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
            "temperature": self.temperature,
        });

        if let (Some(max_tokens), Some(obj)) = (self.max_tokens, body.as_object_mut()) {
            obj.insert("max_tokens".to_string(), json!(max_tokens));
        }

        body
    }
}

#[async_trait]
impl GenerationGateway for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: ChatRequest) -> Result<Completion, ServiceError> {
        let body = self.build_body(&request);
        let payload = self
            .http
            .post_json(GENERATION_SERVICE, "/v1/chat/completions", &body)
            .await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ServiceError::decode(GENERATION_SERVICE, "missing choices[0].message.content"))?
            .to_string();

        Ok(Completion { text: content })
    }
}
