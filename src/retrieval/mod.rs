//! Retrieval seam: the embedding collaborator and an in-memory chunk index.
//!
//! Real deployments plug a vector store in behind [`Embedder`]; the
//! [`MockEmbedder`] keeps the pipeline runnable and deterministic offline.
pub mod index;
pub mod mock;

pub use index::{ChunkIndex, ScoredChunk};
pub use mock::MockEmbedder;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
