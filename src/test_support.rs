//! Hand-written gateway fakes for unit and scenario tests.
//!
//! Each fake records what it was asked so tests can assert on call order
//! and arguments.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{ChatRequest, Completion, EmbeddingGateway, GenerationGateway, ServiceError};
use crate::rag::{DocumentMetadata, RetrievedDocument, Source, VectorRecord, VectorStore};

pub fn fake_failure(service: &str) -> ServiceError {
    ServiceError::Http {
        service: service.to_string(),
        message: "fake failure".to_string(),
    }
}

pub fn doc(content: &str) -> RetrievedDocument {
    doc_from(content, Source::EmailSample, 0)
}

pub fn doc_from(content: &str, source: Source, sequence_index: usize) -> RetrievedDocument {
    RetrievedDocument::new(
        content,
        DocumentMetadata {
            source,
            session_id: None,
            sequence_index,
        },
    )
}

/// Embeds known texts to fixed vectors and everything else to `fallback`.
pub struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    fail: bool,
    latency: Option<Duration>,
    calls: Mutex<Vec<String>>,
    batch_calls: Mutex<usize>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: vec![1.0, 1.0],
            fail: false,
            latency: None,
            calls: Mutex::new(Vec::new()),
            batch_calls: Mutex::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Hold every `embed` call open for `latency` so calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Texts passed to `embed`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn batch_calls(&self) -> usize {
        *self.batch_calls.lock().unwrap()
    }

    /// Most `embed` calls that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingGateway for FakeEmbedder {
    fn name(&self) -> &str {
        "fake-embedder"
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.lock().unwrap().push(text.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(fake_failure("embedding"));
        }
        Ok(self.lookup(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        *self.batch_calls.lock().unwrap() += 1;
        if self.fail {
            return Err(fake_failure("embedding"));
        }
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }
}

/// Replies with queued texts, then with `default_reply`.
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    default_reply: String,
    fail: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeGenerator {
    pub fn new(default_reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(reply.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.prompt_text()).collect()
    }
}

#[async_trait]
impl GenerationGateway for FakeGenerator {
    fn name(&self) -> &str {
        "fake-generator"
    }

    async fn complete(&self, request: ChatRequest) -> Result<Completion, ServiceError> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(fake_failure("generation"));
        }
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());
        Ok(Completion { text })
    }
}

/// A recorded `search` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub top_k: usize,
    pub namespace: Option<String>,
}

/// Returns canned documents per namespace (`None` = default namespace).
pub struct FakeStore {
    documents: HashMap<Option<String>, Vec<RetrievedDocument>>,
    fail: bool,
    searches: Mutex<Vec<SearchCall>>,
    upserts: Mutex<Vec<(String, usize)>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            fail: false,
            searches: Mutex::new(Vec::new()),
            upserts: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_namespace(mut self, namespace: Option<&str>, documents: Vec<RetrievedDocument>) -> Self {
        self.documents.insert(namespace.map(String::from), documents);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.searches.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> Vec<(String, usize)> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    fn name(&self) -> &str {
        "fake-store"
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>, ServiceError> {
        self.searches.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            top_k,
            namespace: namespace.map(String::from),
        });
        if self.fail {
            return Err(fake_failure("vector-store"));
        }
        Ok(self
            .documents
            .get(&namespace.map(String::from))
            .map(|docs| docs.iter().take(top_k).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, ServiceError> {
        if self.fail {
            return Err(fake_failure("vector-store"));
        }
        self.upserts
            .lock()
            .unwrap()
            .push((namespace.to_string(), records.len()));
        Ok(records.len())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ServiceError> {
        if self.fail {
            return Err(fake_failure("vector-store"));
        }
        self.deleted.lock().unwrap().push(namespace.to_string());
        Ok(())
    }
}
