//! Knowledge base for the chat agent.
//!
//! - `Chunker`: splits a corpus into overlapping passages
//! - `KnowledgeStore`: persists passages with embeddings and answers
//!   nearest-neighbour queries

mod chunker;
mod embedder;
mod store;
mod vector_math;

pub use chunker::{Chunk, Chunker, Chunks};
pub use embedder::{Embedder, ProviderEmbedder};
pub use store::{KnowledgeStore, Passage, PassageMatch};
pub use vector_math::{cosine_distance, cosine_similarity};
