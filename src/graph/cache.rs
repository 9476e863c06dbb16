//! Per-repository snapshot cache.
//!
//! A `GraphCache` is an explicit handle owned by the caller. `store` replaces
//! whatever was cached under the same repository id (memory and disk);
//! `load` checks memory first, then the JSON file on disk.
use crate::indexer::chunker::Chunk;
use crate::indexer::edges::Edge;
use crate::indexer::languages::extension_of;
use crate::indexer::source::basename;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stable 12-hex-digit id for a repository URL or path.
pub fn repo_id_for(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    format!("{digest:x}")[..12].to_string()
}

/// Everything one ingestion run produced for a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub repo_id: String,
    /// Checkout location the snapshot was built from.
    pub root: PathBuf,
    pub files: Vec<String>,
    pub edges: Vec<Edge>,
    pub chunks: Vec<Chunk>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// With the leading dot, empty when the file has none.
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
}

impl RepoSnapshot {
    /// Nodes for every traversed file plus the import edges.
    pub fn graph(&self) -> GraphView {
        let nodes = self
            .files
            .iter()
            .map(|f| GraphNode {
                id: f.clone(),
                label: basename(f).to_string(),
                extension: extension_of(f).map(|e| format!(".{e}")).unwrap_or_default(),
            })
            .collect();

        GraphView {
            nodes,
            edges: self.edges.clone(),
        }
    }
}

pub struct GraphCache {
    dir: PathBuf,
    entries: HashMap<String, RepoSnapshot>,
}

impl GraphCache {
    /// Opens (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache dir: {}", dir.display()))?;
        Ok(Self {
            dir,
            entries: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, repo_id: &str) -> PathBuf {
        self.dir.join(format!("{repo_id}.json"))
    }

    /// Persists `snapshot`, replacing any previous entry for its repository.
    pub fn store(&mut self, snapshot: RepoSnapshot) -> Result<()> {
        let path = self.entry_path(&snapshot.repo_id);
        if self.entries.remove(&snapshot.repo_id).is_some() || path.exists() {
            debug!("Evicting previous snapshot for {}", snapshot.repo_id);
        }

        let data = serde_json::to_string(&snapshot).context("failed to serialize snapshot")?;
        fs::write(&path, data)
            .with_context(|| format!("failed to write snapshot: {}", path.display()))?;
        info!(
            "Cached {} ({} files, {} edges, {} chunks)",
            snapshot.repo_id,
            snapshot.files.len(),
            snapshot.edges.len(),
            snapshot.chunks.len()
        );

        self.entries.insert(snapshot.repo_id.clone(), snapshot);
        Ok(())
    }

    /// Cached snapshot for `repo_id`, reading it from disk on a memory miss.
    pub fn load(&mut self, repo_id: &str) -> Result<Option<&RepoSnapshot>> {
        if !self.entries.contains_key(repo_id) {
            let path = self.entry_path(repo_id);
            if !path.exists() {
                return Ok(None);
            }
            let data = fs::read_to_string(&path)
                .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
            let snapshot: RepoSnapshot = serde_json::from_str(&data)
                .with_context(|| format!("corrupt snapshot: {}", path.display()))?;
            debug!("Loaded snapshot {repo_id} from disk");
            self.entries.insert(repo_id.to_string(), snapshot);
        }
        Ok(self.entries.get(repo_id))
    }

    /// Drops `repo_id` from memory and disk. Returns whether anything was removed.
    pub fn evict(&mut self, repo_id: &str) -> Result<bool> {
        let in_memory = self.entries.remove(repo_id).is_some();
        let path = self.entry_path(repo_id);
        let on_disk = path.exists();
        if on_disk {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove snapshot: {}", path.display()))?;
        }
        Ok(in_memory || on_disk)
    }

    /// Ids currently held in memory.
    pub fn loaded_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot(repo_id: &str, files: &[&str]) -> RepoSnapshot {
        RepoSnapshot {
            repo_id: repo_id.to_string(),
            root: PathBuf::from("/tmp/checkout"),
            files: files.iter().map(|f| f.to_string()).collect(),
            edges: vec![],
            chunks: vec![],
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_repo_id_is_stable() {
        let a = repo_id_for("https://github.com/org/repo");
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, repo_id_for("https://github.com/org/repo"));
        assert_ne!(a, repo_id_for("https://github.com/org/other"));
    }

    #[test]
    fn test_graph_view_nodes() {
        let snap = snapshot("r", &["backend/main.py", "Makefile"]);
        let view = snap.graph();
        assert_eq!(
            view.nodes[0],
            GraphNode {
                id: "backend/main.py".into(),
                label: "main.py".into(),
                extension: ".py".into()
            }
        );
        assert_eq!(view.nodes[1].extension, "");
    }

    #[test]
    fn test_store_then_load_from_fresh_handle() {
        let temp = tempdir().unwrap();
        let mut cache = GraphCache::open(temp.path()).unwrap();
        cache.store(snapshot("abc", &["a.py"])).unwrap();
        assert_eq!(cache.loaded_ids(), vec!["abc"]);

        let mut reopened = GraphCache::open(temp.path()).unwrap();
        assert!(reopened.loaded_ids().is_empty());
        let loaded = reopened.load("abc").unwrap().expect("snapshot on disk");
        assert_eq!(loaded.files, vec!["a.py"]);
        assert_eq!(reopened.loaded_ids(), vec!["abc"]);
    }

    #[test]
    fn test_store_replaces_previous_entry() {
        let temp = tempdir().unwrap();
        let mut cache = GraphCache::open(temp.path()).unwrap();
        cache.store(snapshot("abc", &["old.py"])).unwrap();
        cache.store(snapshot("abc", &["new.py"])).unwrap();

        assert_eq!(cache.load("abc").unwrap().unwrap().files, vec!["new.py"]);
        let mut reopened = GraphCache::open(temp.path()).unwrap();
        assert_eq!(reopened.load("abc").unwrap().unwrap().files, vec!["new.py"]);
    }

    #[test]
    fn test_missing_and_evict() {
        let temp = tempdir().unwrap();
        let mut cache = GraphCache::open(temp.path().join("nested")).unwrap();
        assert!(cache.dir().is_dir());
        assert_eq!(cache.dir(), temp.path().join("nested"));
        assert!(cache.load("nope").unwrap().is_none());

        cache.store(snapshot("abc", &[])).unwrap();
        assert!(cache.dir().join("abc.json").is_file());
        assert!(cache.evict("abc").unwrap());
        assert!(!cache.evict("abc").unwrap());
        assert!(cache.load("abc").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_error() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("bad.json"), "{not json").unwrap();
        let mut cache = GraphCache::open(temp.path()).unwrap();
        assert!(cache.load("bad").is_err());
    }
}
