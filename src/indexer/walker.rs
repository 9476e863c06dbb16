//! Repository traversal: which files take part in an ingestion run, and
//! reading them into [`SourceFile`]s.
use super::resolver::{GO_MOD, join_normalized};
use super::source::SourceFile;
use crate::config::Config;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Builds a matcher from glob patterns (matched against repository-relative paths).
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build exclude matcher")
}

/// Repository-relative paths of every code file under `root`, sorted.
///
/// Directories named in `skip_dirs` are pruned, only extensions from the
/// allow-list are kept, and `exclude_patterns` drop individual paths. A root
/// `go.mod` is kept whenever Go sources are.
pub fn collect_paths(root: &Path, config: &Config) -> Result<Vec<String>> {
    anyhow::ensure!(root.is_dir(), "not a directory: {}", root.display());

    let skip_dirs: HashSet<String> = config.skip_dirs.iter().cloned().collect();
    let extensions: HashSet<String> = config
        .code_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let keep_go_mod = extensions.contains("go");
    let excludes = build_globset(&config.exclude_patterns)?;

    // Plain directory walk: ignore files are not consulted.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entry.depth() == 0
                || !is_dir
                || !skip_dirs.contains(entry.file_name().to_string_lossy().as_ref())
        })
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        if !extensions.contains(&ext) && !(keep_go_mod && rel == GO_MOD) {
            continue;
        }
        if excludes.is_match(&rel) {
            debug!("Excluded by pattern: {rel}");
            continue;
        }
        paths.push(rel);
    }

    paths.sort();
    Ok(paths)
}

/// Reads one file, replacing invalid UTF-8.
pub fn read_source_file(root: &Path, rel: &str) -> Result<SourceFile> {
    let bytes = fs::read(root.join(rel)).with_context(|| format!("failed to read {rel}"))?;
    Ok(SourceFile::new(rel, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Reads every listed file. Unreadable files are logged and skipped.
pub fn read_source_files(root: &Path, rels: &[String]) -> Vec<SourceFile> {
    rels.iter()
        .filter_map(|rel| match read_source_file(root, rel) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("{e:#}");
                None
            }
        })
        .collect()
}

/// Lines `start..=end` (1-based) of a repository file, `end = None` meaning
/// the end of the file.
pub fn read_line_range(root: &Path, rel: &str, start: usize, end: Option<usize>) -> Result<Vec<String>> {
    let normalized = join_normalized("", &rel.replace('\\', "/"))
        .filter(|p| !p.is_empty())
        .with_context(|| format!("path escapes repository: {rel}"))?;

    let file = read_source_file(root, &normalized)?;
    let last = end.unwrap_or(file.line_count()).min(file.line_count());
    let first = start.max(1);
    if first > last {
        return Ok(Vec::new());
    }

    Ok(file
        .line_span(first, last)
        .split_inclusive('\n')
        .map(str::to_string)
        .collect())
}
