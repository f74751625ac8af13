pub mod openai;
pub mod prompt;
pub mod provider;
pub mod types;

pub use openai::{OpenAiChat, OpenAiEmbeddings};
pub use provider::{EmbeddingGateway, GenerationGateway};
pub use types::{ChatMessage, ChatRequest, Completion, ServiceError};
