//! # repo-atlas: code graph and citation grounding
//!
//! Walks a source repository, builds a file-level import graph, cuts every
//! file into overlapping line windows that can be cited, and checks the
//! `[file:start-end]` citations in generated answers against the chunks
//! that were actually retrieved.
//!
//! ## Architecture
//!
//! - **[`config`]** : Configuration loading, defaults and validation
//! - **[`indexer`]** : Traversal, import extraction, path resolution, edges, chunking
//! - **[`graph`]** : Snapshot cache and learning-path layout
//! - **[`retrieval`]** : Embedder seam and in-memory chunk index
//! - **[`citation`]** : Citation parsing, validation and determinism checks

pub mod citation;
pub mod config;
pub mod graph;
pub mod indexer;
pub mod retrieval;
