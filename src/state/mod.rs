use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService, VectorBackend};
use crate::drafting::DraftingService;
use crate::llm::{EmbeddingGateway, GenerationGateway, OpenAiChat, OpenAiEmbeddings};
use crate::rag::{MemoryVectorStore, PineconeStore, VectorStore};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Gateways are built once at start-up and injected into the drafting
/// service; requests never construct their own clients.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub drafting: Arc<DraftingService>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading configuration rooted at `paths`
    /// 2. Building the embedding and generation gateways
    /// 3. Connecting the configured vector store
    /// 4. Compiling the drafting graphs
    pub fn initialize_with_paths(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_typed()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let embedder: Arc<dyn EmbeddingGateway> = Arc::new(
            OpenAiEmbeddings::new(&settings.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );
        let generator: Arc<dyn GenerationGateway> = Arc::new(
            OpenAiChat::new(&settings.generation)
                .map_err(|e| InitializationError::Generation(e.into()))?,
        );

        let store: Arc<dyn VectorStore> = match settings.vector_store.backend {
            VectorBackend::Pinecone => Arc::new(
                PineconeStore::new(&settings.vector_store, embedder.clone())
                    .map_err(|e| InitializationError::VectorStore(e.into()))?,
            ),
            VectorBackend::Memory => {
                tracing::warn!("Using the in-memory vector store; ingested emails are not persisted");
                Arc::new(
                    MemoryVectorStore::new(embedder.clone())
                        .with_default_namespace(settings.vector_store.default_namespace.clone()),
                )
            }
        };

        tracing::info!(
            "Gateways ready: embedding={} ({}d), generation={}, store={}",
            embedder.name(),
            embedder.dimension(),
            generator.name(),
            store.name()
        );

        Self::from_gateways(paths, config, settings, embedder, generator, store)
    }

    /// Assemble the state around already-built gateways.
    pub fn from_gateways(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn GenerationGateway>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Arc<Self>, InitializationError> {
        let drafting = DraftingService::new(
            embedder,
            generator,
            store,
            &settings.pipeline,
            settings.vector_store.default_namespace.clone(),
        )
        .map_err(|e| InitializationError::Graph(e.into()))?;

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            drafting: Arc::new(drafting),
        }))
    }
}
