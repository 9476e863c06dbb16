use super::imports::ImportExtractor;
use super::languages::extension_of;
use super::resolver::{GO_MOD, PathResolver, go_module_path};
use super::source::SourceFile;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// `source` imports `target`. Never a self-loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Builds the file dependency graph from import statements.
pub struct EdgeBuilder {
    extractor: ImportExtractor,
    /// Lower-case extensions without the dot. Empty means every file.
    allowed_extensions: HashSet<String>,
}

impl EdgeBuilder {
    pub fn new<I, S>(allowed_extensions: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            extractor: ImportExtractor::new()?,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        })
    }

    pub fn is_allowed(&self, path: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        extension_of(path)
            .map(|ext| self.allowed_extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Deduplicated edges in first-seen order (file order, then import order).
    /// Imports that resolve to nothing, to the importing file itself, or to a
    /// file outside the allow-list are dropped. A root `go.mod` in `files`
    /// supplies the Go module path even when it is not itself allowed.
    pub fn build(&self, files: &[SourceFile]) -> Vec<Edge> {
        let allowed: Vec<&SourceFile> = files.iter().filter(|f| self.is_allowed(&f.path)).collect();
        let mut resolver = PathResolver::new(allowed.iter().map(|f| f.path.as_str()));
        if let Some(module) = files
            .iter()
            .find(|f| f.path == GO_MOD)
            .and_then(|f| go_module_path(f.content()))
        {
            debug!(module = module.as_str(), "go module");
            resolver = resolver.with_go_module(module);
        }

        let per_file: Vec<Vec<Edge>> = allowed
            .par_iter()
            .map(|file| self.edges_for(file, &resolver))
            .collect();

        let mut seen = HashSet::new();
        let edges: Vec<Edge> = per_file
            .into_iter()
            .flatten()
            .filter(|edge| seen.insert(edge.clone()))
            .collect();

        debug!(files = allowed.len(), edges = edges.len(), "built import graph");
        edges
    }

    fn edges_for(&self, file: &SourceFile, resolver: &PathResolver) -> Vec<Edge> {
        let Some(lang) = file.language else {
            return Vec::new();
        };

        self.extractor
            .extract(file)
            .filter_map(|token| resolver.resolve(&token.source_file, &token.raw_text, lang))
            .filter(|target| *target != file.path)
            .map(|target| Edge {
                source: file.path.clone(),
                target,
            })
            .collect()
    }
}
