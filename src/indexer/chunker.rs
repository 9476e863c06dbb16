use super::source::SourceFile;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A contiguous, citable slice of one file. `(file, start_line, end_line)`
/// is its identity; re-chunking identical content reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub file: String,
    #[serde(alias = "start_line")]
    pub start_line: usize,
    #[serde(alias = "end_line")]
    pub end_line: usize,
    #[serde(default)]
    pub text: String,
}

impl Chunk {
    pub fn key(&self) -> (&str, usize, usize) {
        (&self.file, self.start_line, self.end_line)
    }

    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk window must be at least one line")]
    EmptyWindow,

    #[error("chunk overlap ({overlap}) must be smaller than the window ({window})")]
    OverlapTooLarge { window: usize, overlap: usize },
}

/// Fixed-size overlapping line windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(window: usize, overlap: usize) -> Result<Self, ChunkError> {
        if window == 0 {
            return Err(ChunkError::EmptyWindow);
        }
        if overlap >= window {
            return Err(ChunkError::OverlapTooLarge { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the start lines of consecutive chunks.
    pub fn stride(&self) -> usize {
        self.window - self.overlap
    }

    /// Line ranges `(start, end)` for a file of `line_count` lines.
    ///
    /// The cursor advances by the stride and stops as soon as a window
    /// reaches the last line, so a length that is an exact multiple of the
    /// stride never yields a redundant tail chunk.
    pub fn boundaries(&self, line_count: usize) -> Vec<(usize, usize)> {
        let mut bounds = Vec::new();
        if line_count == 0 {
            return bounds;
        }

        let mut start = 1;
        loop {
            let end = (start + self.window - 1).min(line_count);
            bounds.push((start, end));
            if end == line_count {
                break;
            }
            start += self.stride();
        }
        bounds
    }

    /// Chunks of one file. Whitespace-only files produce none.
    pub fn chunk_file(&self, file: &SourceFile) -> Vec<Chunk> {
        if file.content().trim().is_empty() {
            return Vec::new();
        }

        self.boundaries(file.line_count())
            .into_iter()
            .map(|(start_line, end_line)| Chunk {
                file: file.path.clone(),
                start_line,
                end_line,
                text: file.line_span(start_line, end_line).to_string(),
            })
            .collect()
    }

    /// Chunks of every file, files processed in parallel, output in input order.
    pub fn chunk_files(&self, files: &[SourceFile]) -> Vec<Chunk> {
        files
            .par_iter()
            .map(|file| self.chunk_file(file))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}
