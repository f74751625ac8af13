//! Retrieval layer.
//!
//! - `VectorStore`: namespaced similarity search (Pinecone or in-memory)
//! - `Ingestor`: splits, embeds and upserts reference corpora

pub mod ingest;
pub mod memory;
pub mod pinecone;
pub mod store;

pub use ingest::{documents_from_corpus, history_documents, DatasetEntry, Ingestor};
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;
pub use store::{DocumentMetadata, RetrievedDocument, Session, Source, VectorRecord, VectorStore};
