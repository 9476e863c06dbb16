use super::{Embedder, EmbedderError};
use crate::indexer::chunker::Chunk;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// A retrieved chunk with its cosine distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub distance: f64,
}

/// In-memory cosine index over a chunk set.
pub struct ChunkIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// `1 - cos(a, b)`; zero vectors are maximally distant from everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - f64::from(dot / (norm_a * norm_b))
}

fn by_rank(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.chunk.file.cmp(&b.chunk.file))
        .then_with(|| a.chunk.start_line.cmp(&b.chunk.start_line))
        .then_with(|| a.chunk.end_line.cmp(&b.chunk.end_line))
}

impl ChunkIndex {
    /// Embeds every chunk's text.
    pub fn build(embedder: &dyn Embedder, chunks: Vec<Chunk>) -> Result<Self, EmbedderError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if let Some(v) = vectors.iter().find(|v| v.len() != embedder.dimensions()) {
            return Err(EmbedderError::DimensionMismatch {
                expected: embedder.dimensions(),
                actual: v.len(),
            });
        }
        debug!("Indexed {} chunks", chunks.len());
        Ok(Self { chunks, vectors })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `top_k` nearest chunks. Distances are rounded to 6 decimals and
    /// ties broken by `(file, startLine, endLine)`, so equal inputs always
    /// come back in the same order.
    pub fn query(
        &self,
        embedder: &dyn Embedder,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbedderError> {
        let query = embedder.embed(question)?;
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(&self.vectors)
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                distance: round6(cosine_distance(&query, vector)),
            })
            .collect();

        scored.sort_by(by_rank);
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::MockEmbedder;

    fn chunk(file: &str, start: usize, text: &str) -> Chunk {
        Chunk {
            file: file.to_string(),
            start_line: start,
            end_line: start + 9,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let embedder = MockEmbedder::new(4096);
        let index = ChunkIndex::build(
            &embedder,
            vec![
                chunk("db.py", 1, "def connect(database_url): pool = create_pool()"),
                chunk("auth.py", 1, "def login(user, password): verify password hash"),
                chunk("ui.py", 1, "render button widget layout"),
            ],
        )
        .unwrap();

        let hits = index.query(&embedder, "how does login verify the password", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.file, "auth.py");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_ties_break_on_location() {
        let embedder = MockEmbedder::default();
        let index = ChunkIndex::build(
            &embedder,
            vec![
                chunk("b.py", 11, "same text"),
                chunk("a.py", 11, "same text"),
                chunk("a.py", 1, "same text"),
            ],
        )
        .unwrap();

        let hits = index.query(&embedder, "same text", 8).unwrap();
        let order: Vec<(&str, usize)> = hits.iter().map(|h| (h.chunk.file.as_str(), h.chunk.start_line)).collect();
        assert_eq!(order, vec![("a.py", 1), ("a.py", 11), ("b.py", 11)]);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_repeated_queries_agree() {
        let embedder = MockEmbedder::default();
        let chunks = (0..20)
            .map(|i| chunk(&format!("f{}.py", i % 3), i * 10 + 1, &format!("token{} shared", i % 4)))
            .collect();
        let index = ChunkIndex::build(&embedder, chunks).unwrap();
        let first = index.query(&embedder, "shared token1", 8).unwrap();
        for _ in 0..3 {
            assert_eq!(index.query(&embedder, "shared token1", 8).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_index() {
        let embedder = MockEmbedder::default();
        let index = ChunkIndex::build(&embedder, vec![]).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&embedder, "anything", 8).unwrap().is_empty());
    }

    #[test]
    fn test_scored_chunk_serializes_flat() {
        let scored = ScoredChunk {
            chunk: chunk("a.py", 1, "x"),
            distance: 0.25,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["startLine"], 1);
        assert_eq!(json["distance"], 0.25);
    }
}
