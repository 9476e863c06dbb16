/// Configuration module for repo-atlas.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::graph::layout::LayoutConfig;
use crate::indexer::walker::build_globset;

pub const DEFAULT_CONFIG_FILE: &str = "atlas.json";

// ── Default value functions ──────────────────────────────────────────

fn default_code_extensions() -> Vec<String> {
    [
        ".py", ".js", ".jsx", ".ts", ".tsx", ".go", ".rs", ".java", ".rb", ".c", ".cpp", ".h",
        ".hpp", ".cs", ".swift", ".kt", ".scala", ".vue", ".svelte", ".html", ".css", ".scss",
        ".sql", ".sh", ".yaml", ".yml", ".toml", ".json", ".md", ".txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "build",
        "dist",
        "__pycache__",
        ".venv",
        "venv",
        ".next",
        ".nuxt",
        "vendor",
        "target",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_chunk_size() -> usize {
    80
}

fn default_chunk_overlap() -> usize {
    10
}

fn default_search_top_k() -> usize {
    8
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("repo-atlas"))
        .unwrap_or_else(|| PathBuf::from("./.atlas_cache"))
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Extension allow-list for traversal and edge building.
    #[serde(default = "default_code_extensions")]
    pub code_extensions: Vec<String>,

    /// Directory names pruned anywhere in the tree.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Globs over repository-relative paths.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            code_extensions: default_code_extensions(),
            skip_dirs: default_skip_dirs(),
            exclude_patterns: Vec::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_top_k: default_search_top_k(),
            cache_dir: default_cache_dir(),
            layout: LayoutConfig::default(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `atlas.json`.
    /// If the file does not exist, returns a default config and, for the
    /// default path only, writes a template.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_FILE
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_FILE {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(
            !self.code_extensions.is_empty(),
            "at least one code extension must be specified"
        );
        build_globset(&self.exclude_patterns)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 80);
        assert_eq!(config.chunk_overlap, 10);
        assert_eq!(config.search_top_k, 8);
        assert!(config.code_extensions.contains(&".py".to_string()));
        assert!(config.skip_dirs.contains(&"node_modules".to_string()));
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(config.layout.iterations, 8);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"chunk_size": 40, "chunk_overlap": 5, "layout": {"iterations": 3}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 40);
        assert_eq!(config.chunk_overlap, 5);
        assert_eq!(config.layout.iterations, 3);
        // Other fields should have defaults
        assert_eq!(config.search_top_k, 8);
        assert_eq!(config.layout.node_width, 220.0);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_chunk_size() {
        let mut config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_not_smaller_than_window() {
        let mut config = Config::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_extensions() {
        let mut config = Config::default();
        config.code_extensions = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_exclude_pattern() {
        let mut config = Config::default();
        config.exclude_patterns = vec!["src/[".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_non_default_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("custom.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
        assert!(!path.exists(), "template is only written for atlas.json");
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{chunk_size: ").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.chunk_size, 80);
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("atlas.json");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.chunk_size = 50;
        config.exclude_patterns = vec!["**/generated/**".to_string()];
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded, config);
    }
}
