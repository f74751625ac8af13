//! Retrieval-augmented email drafting service.
//!
//! Past emails and Q&A datasets are embedded into a namespaced vector
//! store; a fixed stage graph retrieves from them, drafts a reply in the
//! user's style and ranks the evidence against the generated text.

pub mod core;
pub mod drafting;
pub mod graph;
pub mod llm;
pub mod rag;
pub mod scoring;
pub mod server;
pub mod state;
pub mod vector_math;

#[cfg(test)]
pub(crate) mod test_support;
