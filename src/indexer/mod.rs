pub mod chunker;
pub mod core;
pub mod edges;
pub mod imports;
pub mod languages;
pub mod resolver;
pub mod source;
pub mod walker;

pub use chunker::{Chunk, ChunkError, Chunker};
pub use self::core::{IngestReport, Indexer};
pub use edges::{Edge, EdgeBuilder};
pub use imports::{ImportExtractor, ImportToken};
pub use languages::Language;
pub use resolver::PathResolver;
pub use source::SourceFile;
