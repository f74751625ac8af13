use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedding gateway: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize generation gateway: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[source] anyhow::Error),

    #[error("Failed to build drafting graph: {0}")]
    Graph(#[source] anyhow::Error),
}
