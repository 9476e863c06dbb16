use super::chunker::Chunker;
use super::edges::EdgeBuilder;
use super::source::SourceFile;
use super::walker;
use crate::config::Config;
use crate::graph::cache::RepoSnapshot;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub repo_id: String,
    pub files: usize,
    pub chunks: usize,
    pub edges: usize,
}

/// Turns a traversed file set into a snapshot: import edges plus chunks.
pub struct Indexer {
    chunker: Chunker,
    edge_builder: EdgeBuilder,
}

impl Indexer {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let edge_builder = EdgeBuilder::new(&config.code_extensions)
            .context("failed to compile import patterns")?;
        Ok(Self {
            chunker,
            edge_builder,
        })
    }

    /// Builds the snapshot for an already-read file set. `files` is taken as
    /// the complete traversal of `root`.
    pub fn index_files(&self, repo_id: &str, root: &Path, files: &[SourceFile]) -> (RepoSnapshot, IngestReport) {
        let edges = self.edge_builder.build(files);
        let chunks = self.chunker.chunk_files(files);

        let report = IngestReport {
            repo_id: repo_id.to_string(),
            files: files.len(),
            chunks: chunks.len(),
            edges: edges.len(),
        };
        info!(
            "Indexed {}: {} files, {} edges, {} chunks",
            repo_id, report.files, report.edges, report.chunks
        );

        let snapshot = RepoSnapshot {
            repo_id: repo_id.to_string(),
            root: root.to_path_buf(),
            files: files.iter().map(|f| f.path.clone()).collect(),
            edges,
            chunks,
            ingested_at: Utc::now(),
        };
        (snapshot, report)
    }

    /// Traverses `root`, reads every selected file, and indexes the result.
    pub fn index_directory(
        &self,
        repo_id: &str,
        root: &Path,
        config: &Config,
    ) -> Result<(RepoSnapshot, IngestReport)> {
        let paths = walker::collect_paths(root, config)?;
        info!("Found {} files under {}", paths.len(), root.display());
        let files = walker::read_source_files(root, &paths);
        Ok(self.index_files(repo_id, root, &files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_files() {
        let config = Config::default();
        let indexer = Indexer::new(&config).unwrap();
        let files = vec![
            SourceFile::new("app/main.py", "import app.util\nimport os\n\napp.util.run()\n"),
            SourceFile::new("app/util.py", "def run():\n    pass\n"),
            SourceFile::new("app/__init__.py", ""),
        ];

        let (snapshot, report) = indexer.index_files("r1", Path::new("/repo"), &files);
        assert_eq!(
            report,
            IngestReport {
                repo_id: "r1".into(),
                files: 3,
                chunks: 2,
                edges: 1
            }
        );
        assert_eq!(snapshot.files, vec!["app/main.py", "app/util.py", "app/__init__.py"]);
        assert_eq!(snapshot.edges[0].source, "app/main.py");
        assert_eq!(snapshot.edges[0].target, "app/util.py");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.chunk_overlap = 80;
        assert!(Indexer::new(&config).is_err());
    }

    #[test]
    fn test_report_wire_format() {
        let report = IngestReport {
            repo_id: "abc".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["repoId"], "abc");
    }
}
