//! Post-hoc similarity ranking of generated text against retrieved evidence.
//!
//! Each document's cosine similarity to the generated text is divided by its
//! one-based retrieval rank, so a weak retrieval match cannot outrank a
//! strong one just by scoring well in isolation. Output is sorted by the
//! weighted score, descending, with equal scores kept in retrieval order.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::core::config::PipelineConfig;
use crate::llm::{EmbeddingGateway, ServiceError};
use crate::rag::RetrievedDocument;
use crate::vector_math::{cosine_similarity, descending};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDocument {
    pub content: String,
    pub weighted_similarity: f32,
    pub raw_similarity: f32,
    /// Zero-based position in the retrieval ordering.
    pub position: usize,
}

/// `raw / (position + 1)`
pub fn positional_decay(raw_similarity: f32, position: usize) -> f32 {
    raw_similarity / (position as f32 + 1.0)
}

/// Apply decay to raw scores given in retrieval order and sort descending.
pub fn rank(raw: Vec<(String, f32)>) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = raw
        .into_iter()
        .enumerate()
        .map(|(position, (content, raw_similarity))| ScoredDocument {
            content,
            weighted_similarity: positional_decay(raw_similarity, position),
            raw_similarity,
            position,
        })
        .collect();

    // sort_by is stable: ties keep retrieval order
    scored.sort_by(|a, b| descending(a.weighted_similarity, b.weighted_similarity));
    scored
}

/// Best weighted score of a ranking, if any.
pub fn top_similarity(similarities: Option<&[ScoredDocument]>) -> Option<f32> {
    similarities
        .and_then(|s| s.first())
        .map(|doc| doc.weighted_similarity)
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Upper bound on document embedding requests in flight.
    pub max_concurrency: usize,
    /// Embed all documents with one batched request.
    pub batch: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            batch: false,
        }
    }
}

impl From<&PipelineConfig> for ScorerConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_concurrency: config.max_embedding_concurrency.max(1),
            batch: config.batch_scoring_embeddings,
        }
    }
}

pub struct SimilarityScorer {
    embedder: Arc<dyn EmbeddingGateway>,
    config: ScorerConfig,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn EmbeddingGateway>, config: ScorerConfig) -> Self {
        Self { embedder, config }
    }

    /// Embedding requests one `score` call issues for `documents` inputs.
    pub fn embedding_calls(&self, documents: usize) -> usize {
        match (documents, self.config.batch) {
            (0, _) => 0,
            (_, true) => 2,
            (n, false) => 1 + n,
        }
    }

    /// Rank `documents` by positionally decayed similarity to `generated`.
    ///
    /// Returns `Ok(None)` when there is nothing to rank.
    pub async fn score(
        &self,
        generated: &str,
        documents: &[RetrievedDocument],
    ) -> Result<Option<Vec<ScoredDocument>>, ServiceError> {
        if documents.is_empty() {
            return Ok(None);
        }

        tracing::debug!(
            "Scoring {} documents ({} embedding calls)",
            documents.len(),
            self.embedding_calls(documents.len())
        );

        let generated_embedding = self.embedder.embed(generated).await?;
        let document_embeddings = self.embed_documents(documents).await?;

        let mut raw = Vec::with_capacity(documents.len());
        for (document, embedding) in documents.iter().zip(document_embeddings.iter()) {
            let similarity = cosine_similarity(&generated_embedding, embedding)
                .map_err(|e| ServiceError::decode(self.embedder.name(), e.to_string()))?;
            raw.push((document.content.clone(), similarity));
        }

        Ok(Some(rank(raw)))
    }

    async fn embed_documents(
        &self,
        documents: &[RetrievedDocument],
    ) -> Result<Vec<Vec<f32>>, ServiceError> {
        if self.config.batch {
            let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(ServiceError::decode(
                    self.embedder.name(),
                    format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
                ));
            }
            return Ok(vectors);
        }

        let pending: Vec<_> = documents
            .iter()
            .map(|document| self.embedder.embed(&document.content))
            .collect();
        stream::iter(pending)
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc, FakeEmbedder};

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    fn scorer(embedder: FakeEmbedder, batch: bool) -> (Arc<FakeEmbedder>, SimilarityScorer) {
        let embedder = Arc::new(embedder);
        let scorer = SimilarityScorer::new(
            embedder.clone(),
            ScorerConfig {
                max_concurrency: 2,
                batch,
            },
        );
        (embedder, scorer)
    }

    /// Generated text on the x axis; documents at fixed angles to it.
    fn fixture() -> FakeEmbedder {
        FakeEmbedder::new()
            .with("draft", vec![1.0, 0.0])
            .with("close", vec![0.8, 0.6])
            .with("far", vec![0.0, 1.0])
            .with("exact", vec![2.0, 0.0])
            .with("zero", vec![0.0, 0.0])
    }

    #[test]
    fn decay_divides_by_one_based_position() {
        assert!(approx_eq(positional_decay(0.8, 0), 0.8));
        assert!(approx_eq(positional_decay(0.8, 1), 0.4));
        assert!(approx_eq(positional_decay(0.9, 2), 0.3));
    }

    #[test]
    fn equal_raw_scores_are_separated_by_position() {
        let ranked = rank(vec![("first".to_string(), 0.8), ("second".to_string(), 0.8)]);
        assert_eq!(ranked[0].content, "first");
        assert!(approx_eq(ranked[0].weighted_similarity, 0.8));
        assert!(approx_eq(ranked[1].weighted_similarity, 0.4));
    }

    #[test]
    fn exact_ties_keep_retrieval_order() {
        // 0.6 / 2 == 0.3 / 1
        let ranked = rank(vec![
            ("a".to_string(), 0.3),
            ("b".to_string(), 0.6),
        ]);
        assert!(approx_eq(ranked[0].weighted_similarity, ranked[1].weighted_similarity));
        assert_eq!(ranked[0].content, "a");
        assert_eq!(ranked[1].content, "b");
    }

    #[test]
    fn top_similarity_reads_first_entry() {
        let ranked = rank(vec![("a".to_string(), 0.5)]);
        assert_eq!(top_similarity(Some(ranked.as_slice())), Some(0.5));
        assert_eq!(top_similarity(Some(&[][..])), None);
        assert_eq!(top_similarity(None), None);
    }

    #[tokio::test]
    async fn empty_documents_score_to_none_without_embedding() {
        let (embedder, scorer) = scorer(fixture(), false);
        assert_eq!(scorer.score("draft", &[]).await.unwrap(), None);
        assert_eq!(embedder.call_count(), 0);
        assert_eq!(scorer.embedding_calls(0), 0);
    }

    #[tokio::test]
    async fn scores_are_weighted_and_sorted() {
        let (embedder, scorer) = scorer(fixture(), false);
        let documents = vec![doc("far"), doc("close"), doc("exact")];

        let ranked = scorer.score("draft", &documents).await.unwrap().unwrap();

        assert_eq!(ranked.len(), documents.len());
        for pair in ranked.windows(2) {
            assert!(pair[0].weighted_similarity >= pair[1].weighted_similarity);
        }
        for scored in &ranked {
            assert!(approx_eq(
                scored.weighted_similarity,
                scored.raw_similarity / (scored.position as f32 + 1.0)
            ));
        }

        // exact: 1.0 / 3, close: 0.8 / 2, far: 0.0 / 1
        assert_eq!(ranked[0].content, "close");
        assert!(approx_eq(ranked[0].weighted_similarity, 0.4));
        assert_eq!(ranked[1].content, "exact");
        assert!(approx_eq(ranked[1].weighted_similarity, 1.0 / 3.0));
        assert_eq!(ranked[2].content, "far");

        assert_eq!(embedder.call_count(), 1 + documents.len());
        assert_eq!(embedder.calls()[0], "draft");
        assert_eq!(scorer.embedding_calls(documents.len()), 4);
    }

    #[tokio::test]
    async fn first_position_keeps_raw_score() {
        let (_, scorer) = scorer(fixture(), false);
        let ranked = scorer
            .score("draft", &[doc("close")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ranked[0].position, 0);
        assert!(approx_eq(ranked[0].weighted_similarity, ranked[0].raw_similarity));
        assert!(approx_eq(ranked[0].raw_similarity, 0.8));
    }

    #[tokio::test]
    async fn zero_vectors_score_zero() {
        let (_, scorer) = scorer(fixture(), false);
        let ranked = scorer
            .score("draft", &[doc("zero"), doc("close")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ranked[0].content, "close");
        assert_eq!(ranked[1].raw_similarity, 0.0);
        assert!(!ranked[1].weighted_similarity.is_nan());
    }

    #[tokio::test]
    async fn scoring_is_repeatable() {
        let (_, scorer) = scorer(fixture(), false);
        let documents = vec![doc("close"), doc("far"), doc("exact")];
        let first = scorer.score("draft", &documents).await.unwrap();
        let second = scorer.score("draft", &documents).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batching_changes_call_count_not_output() {
        let documents = vec![doc("far"), doc("close"), doc("exact")];
        let (_, sequential) = scorer(fixture(), false);
        let (batched_embedder, batched) = scorer(fixture(), true);

        let expected = sequential.score("draft", &documents).await.unwrap();
        let actual = batched.score("draft", &documents).await.unwrap();

        assert_eq!(expected, actual);
        assert_eq!(batched_embedder.batch_calls(), 1);
        assert_eq!(batched.embedding_calls(documents.len()), 2);
    }

    #[tokio::test]
    async fn document_embeddings_respect_concurrency_cap() {
        let embedder = Arc::new(
            FakeEmbedder::new().with_latency(std::time::Duration::from_millis(20)),
        );
        let scorer = SimilarityScorer::new(
            embedder.clone(),
            ScorerConfig {
                max_concurrency: 3,
                batch: false,
            },
        );
        let documents: Vec<_> = (0..10).map(|i| doc(&format!("mail {}", i))).collect();

        let ranked = scorer.score("draft", &documents).await.unwrap().unwrap();

        assert_eq!(ranked.len(), 10);
        assert_eq!(embedder.call_count(), 11);
        assert!(embedder.peak_in_flight() <= 3);
        assert!(embedder.peak_in_flight() > 1);
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let (_, scorer) = scorer(FakeEmbedder::new().failing(), false);
        let result = scorer.score("draft", &[doc("close")]).await;
        assert!(matches!(result, Err(ServiceError::Http { .. })));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_a_decode_error() {
        let embedder = FakeEmbedder::new()
            .with("draft", vec![1.0, 0.0])
            .with("odd", vec![1.0, 0.0, 0.0]);
        let (_, scorer) = scorer(embedder, false);
        let result = scorer.score("draft", &[doc("odd")]).await;
        assert!(matches!(result, Err(ServiceError::Decode { .. })));
    }
}
