pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod memory;
pub mod retriever;

pub use embeddings::EmbeddingClient;
pub use ingest::DocumentIngestor;
pub use memory::{Memory, MemoryManager};
pub use retriever::{Retriever, ScoredChunk};
