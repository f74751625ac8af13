use std::sync::Arc;

use super::*;
use crate::rag::{RetrievedDocument, Session, Source};
use crate::scoring::{ScorerConfig, SimilarityScorer};
use crate::test_support::{doc_from, FakeEmbedder, FakeGenerator, FakeStore};

const THESIS_QUESTION: &str = "write a email to schedule a thesis meeting with supervisor";

struct Harness {
    embedder: Arc<FakeEmbedder>,
    generator: FakeGenerator,
    store: FakeStore,
    scorer: SimilarityScorer,
}

impl Harness {
    fn new(embedder: FakeEmbedder, generator: FakeGenerator, store: FakeStore) -> Self {
        let embedder = Arc::new(embedder);
        let scorer = SimilarityScorer::new(embedder.clone(), ScorerConfig::default());
        Self {
            embedder,
            generator,
            store,
            scorer,
        }
    }

    fn ctx(&self) -> NodeContext<'_> {
        NodeContext {
            generator: &self.generator,
            store: &self.store,
            scorer: &self.scorer,
            top_k: 5,
        }
    }

    async fn run(
        &self,
        variant: PipelineVariant,
        state: PipelineState,
    ) -> Result<PipelineState, GraphError> {
        let graph = build_graph(variant).unwrap();
        graph.run(state, &self.ctx()).await
    }
}

fn emails(prefix: &str, count: usize) -> Vec<RetrievedDocument> {
    (0..count)
        .map(|i| doc_from(&format!("{} {}", prefix, i), Source::EmailSample, i))
        .collect()
}

fn assert_sorted_descending(state: &PipelineState) {
    let similarities = state.similarities.as_ref().unwrap();
    for pair in similarities.windows(2) {
        assert!(pair[0].weighted_similarity >= pair[1].weighted_similarity);
    }
}

#[test]
fn variants_compile_to_fixed_stage_order() {
    assert_eq!(
        build_two_stage_graph().unwrap().stage_ids(),
        vec!["retrieve", "generate"]
    );
    assert_eq!(
        build_four_stage_graph().unwrap().stage_ids(),
        vec![
            "dataset_retrieve",
            "generate_raw",
            "reference_emails_retrieve",
            "refine"
        ]
    );
}

#[tokio::test]
async fn two_stage_drafts_from_reference_corpus() {
    let harness = Harness::new(
        FakeEmbedder::new()
            .with("past mail 0", vec![1.0, 0.2])
            .with("past mail 2", vec![0.1, 1.0]),
        FakeGenerator::new("Dear Professor, could we meet on Thursday?"),
        FakeStore::new().with_namespace(None, emails("past mail", 7)),
    );

    let state = harness
        .run(PipelineVariant::TwoStage, PipelineState::new(THESIS_QUESTION))
        .await
        .unwrap();

    let context = state.context.as_ref().unwrap();
    assert_eq!(context.len(), 5);
    assert_eq!(context[0].content, "past mail 0");
    assert_eq!(
        state.answer.as_deref(),
        Some("Dear Professor, could we meet on Thursday?")
    );
    assert_eq!(state.similarities.as_ref().unwrap().len(), context.len());
    assert_sorted_descending(&state);

    let searches = harness.store.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].query, THESIS_QUESTION);
    assert_eq!(searches[0].top_k, 5);
    assert_eq!(searches[0].namespace, None);

    let prompts = harness.generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("past mail 0\n\npast mail 1"));
    assert!(prompts[0].contains(THESIS_QUESTION));
    assert!(!prompts[0].contains("No past emails"));

    // generated text once, then every context document
    assert_eq!(harness.embedder.call_count(), 1 + context.len());
}

#[tokio::test]
async fn two_stage_searches_the_session_namespace() {
    let session = Session::new("s1");
    let harness = Harness::new(
        FakeEmbedder::new(),
        FakeGenerator::new("reply"),
        FakeStore::new().with_namespace(Some("s1"), emails("mine", 2)),
    );

    let state = harness
        .run(
            PipelineVariant::TwoStage,
            PipelineState::new("hi").with_session(Some(session)),
        )
        .await
        .unwrap();

    assert_eq!(state.context.as_ref().unwrap().len(), 2);
    assert_eq!(harness.store.searches()[0].namespace.as_deref(), Some("s1"));
}

#[tokio::test]
async fn empty_corpus_falls_back_to_generic_reply() {
    let harness = Harness::new(
        FakeEmbedder::new(),
        FakeGenerator::new("Dear Sir or Madam"),
        FakeStore::new(),
    );

    let state = harness
        .run(PipelineVariant::TwoStage, PipelineState::new(THESIS_QUESTION))
        .await
        .unwrap();

    assert_eq!(state.context, Some(Vec::new()));
    assert_eq!(state.answer.as_deref(), Some("Dear Sir or Madam"));
    assert!(state.similarities.is_none());
    assert!(harness.generator.prompts()[0].contains("No past emails"));
    assert_eq!(harness.embedder.call_count(), 0);
}

#[tokio::test]
async fn four_stage_scores_refined_answer_against_dataset() {
    let dataset = vec![
        doc_from("Question: Deadline?\nAnswer: Friday", Source::Dataset, 0),
        doc_from("Question: Room?\nAnswer: B12", Source::Dataset, 1),
    ];
    let references = vec![
        doc_from("Cheers, Anna", Source::WritingStyle, 0),
        doc_from("Best, Anna", Source::WritingStyle, 1),
    ];
    let harness = Harness::new(
        FakeEmbedder::new()
            .with("The deadline is Friday.", vec![1.0, 0.0])
            .with("Question: Deadline?\nAnswer: Friday", vec![0.9, 0.1]),
        FakeGenerator::new("unused")
            .then("The deadline is Friday in room B12.")
            .then("Subject: Deadline\nThe deadline is Friday."),
        FakeStore::new()
            .with_namespace(Some("s1-dataset"), dataset.clone())
            .with_namespace(Some("s1"), references.clone()),
    );

    let initial = PipelineState::new("When is the deadline?")
        .with_session(Some(Session::new("s1")))
        .with_history(vec!["Hi, quick question about the project.".to_string()]);
    let state = harness.run(PipelineVariant::FourStage, initial).await.unwrap();

    assert_eq!(state.answer.as_deref(), Some("The deadline is Friday."));
    assert_eq!(state.dataset.as_ref(), Some(&dataset));
    assert_eq!(state.reference_emails.as_ref(), Some(&references));
    assert_eq!(state.similarities.as_ref().unwrap().len(), dataset.len());
    assert_sorted_descending(&state);

    let namespaces: Vec<Option<String>> = harness
        .store
        .searches()
        .into_iter()
        .map(|s| s.namespace)
        .collect();
    assert_eq!(
        namespaces,
        vec![Some("s1-dataset".to_string()), Some("s1".to_string())]
    );

    let prompts = harness.generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Answer: Friday"));
    assert!(prompts[0].contains("1. Hi, quick question about the project."));
    assert!(prompts[1].contains("Cheers, Anna\n\nBest, Anna"));
    assert!(prompts[1].contains("The deadline is Friday in room B12."));

    // The last scoring pass embeds the refined answer and then the dataset,
    // never the reference emails it was conditioned on.
    let calls = harness.embedder.calls();
    let final_pass = &calls[calls.len() - 1 - dataset.len()..];
    let mut expected = vec!["The deadline is Friday.".to_string()];
    expected.extend(dataset.iter().map(|d| d.content.clone()));
    assert_eq!(final_pass, expected.as_slice());
    assert!(!calls.iter().any(|c| c.contains("Anna")));
}

#[tokio::test]
async fn four_stage_requires_a_session() {
    let harness = Harness::new(
        FakeEmbedder::new(),
        FakeGenerator::new("reply"),
        FakeStore::new(),
    );

    let err = harness
        .run(PipelineVariant::FourStage, PipelineState::new("q"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, GraphErrorKind::MalformedInput);
    assert_eq!(err.node_id, "dataset_retrieve");
    assert!(harness.store.searches().is_empty());
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn service_failure_aborts_the_run_with_trace() {
    let harness = Harness::new(
        FakeEmbedder::new(),
        FakeGenerator::new("reply").failing(),
        FakeStore::new().with_namespace(None, emails("past mail", 2)),
    );

    let err = harness
        .run(PipelineVariant::TwoStage, PipelineState::new("q"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, GraphErrorKind::Service);
    assert_eq!(err.node_id, "generate");
    assert_eq!(err.execution_trace, vec!["retrieve", "generate"]);
    assert_eq!(harness.embedder.call_count(), 0);
}

#[tokio::test]
async fn store_failure_stops_before_generation() {
    let harness = Harness::new(
        FakeEmbedder::new(),
        FakeGenerator::new("reply"),
        FakeStore::new().failing(),
    );

    let err = harness
        .run(PipelineVariant::TwoStage, PipelineState::new("q"))
        .await
        .unwrap_err();

    assert_eq!(err.node_id, "retrieve");
    assert_eq!(err.execution_trace, vec!["retrieve"]);
    assert!(harness.generator.requests().is_empty());
}

#[test]
fn retrieve_stages_write_their_own_slot() {
    use super::nodes::RetrieveNode;

    assert_eq!(RetrieveNode::context().target(), DocumentField::Context);
    assert_eq!(RetrieveNode::dataset().target(), DocumentField::Dataset);
    assert_eq!(
        RetrieveNode::reference_emails().target(),
        DocumentField::ReferenceEmails
    );
}
