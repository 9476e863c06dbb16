use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use repo_atlas::citation::{self, AnswerRecord, CitationParser};
use repo_atlas::config::{Config, DEFAULT_CONFIG_FILE};
use repo_atlas::graph::{GraphCache, RepoSnapshot, layout_learning_path, repo_id_for};
use repo_atlas::indexer::walker;
use repo_atlas::indexer::{Chunk, Indexer};
use repo_atlas::retrieval::{ChunkIndex, MockEmbedder};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Import graph, citable chunks and citation grounding for a code repository", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a checkout, build edges and chunks, and cache the snapshot
    Ingest {
        dir: PathBuf,

        /// Repository URL or name the id is derived from (default: the canonical path)
        #[arg(long)]
        source: Option<String>,
    },

    /// Print the cached dependency graph
    Graph { repo_id: String },

    /// Retrieve the chunks closest to a question
    Search {
        repo_id: String,
        question: String,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Check an answer's citations against retrieved chunks
    Validate {
        /// Answer text file, `-` for stdin
        #[arg(long)]
        answer: String,

        /// JSON array of retrieved chunks
        #[arg(long)]
        chunks: PathBuf,
    },

    /// Position a learning path and its direct imports
    Layout {
        repo_id: String,

        /// Ordered, comma-separated file paths
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,
    },

    /// Print a line range of a cached repository's file
    Source {
        repo_id: String,
        file: String,

        #[arg(long, default_value_t = 1)]
        start: usize,

        #[arg(long)]
        end: Option<usize>,
    },

    /// Check that recorded outputs of repeated runs agree
    Determinism {
        /// JSON array of `{answer, citations, chunks}` records
        records: PathBuf,

        #[arg(long, default_value_t = 0)]
        tolerance: usize,
    },
}

fn main() -> Result<()> {
    // stdout carries JSON; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Ingest { dir, source } => ingest(&config, &dir, source),
        Commands::Graph { repo_id } => {
            let mut cache = GraphCache::open(&config.cache_dir)?;
            print_json(&load_snapshot(&mut cache, &repo_id)?.graph())
        }
        Commands::Search {
            repo_id,
            question,
            top_k,
        } => {
            let mut cache = GraphCache::open(&config.cache_dir)?;
            let snapshot = load_snapshot(&mut cache, &repo_id)?;
            let embedder = MockEmbedder::default();
            let index = ChunkIndex::build(&embedder, snapshot.chunks.clone())?;
            let hits = index.query(&embedder, &question, top_k.unwrap_or(config.search_top_k))?;
            print_json(&hits)
        }
        Commands::Validate { answer, chunks } => validate(&answer, &chunks),
        Commands::Layout { repo_id, steps } => {
            let mut cache = GraphCache::open(&config.cache_dir)?;
            let snapshot = load_snapshot(&mut cache, &repo_id)?;
            for step in steps.iter().filter(|s| !snapshot.files.contains(*s)) {
                warn!("Step {step} is not a file of {repo_id}");
            }
            print_json(&layout_learning_path(&steps, &snapshot.edges, &config.layout))
        }
        Commands::Source {
            repo_id,
            file,
            start,
            end,
        } => {
            let mut cache = GraphCache::open(&config.cache_dir)?;
            let snapshot = load_snapshot(&mut cache, &repo_id)?;
            let lines = walker::read_line_range(&snapshot.root, &file, start, end)?;
            print!("{}", lines.concat());
            Ok(())
        }
        Commands::Determinism { records, tolerance } => {
            let data = std::fs::read_to_string(&records)
                .with_context(|| format!("failed to read records: {}", records.display()))?;
            let records: Vec<AnswerRecord> =
                serde_json::from_str(&data).context("records must be a JSON array")?;
            citation::validate_deterministic(&records, tolerance)?;
            let hashes: Vec<String> = records.iter().map(citation::hash_output).collect();
            print_json(&serde_json::json!({ "deterministic": true, "hashes": hashes }))
        }
    }
}

fn ingest(config: &Config, dir: &Path, source: Option<String>) -> Result<()> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", dir.display()))?;
    let repo_id = repo_id_for(&source.unwrap_or_else(|| root.to_string_lossy().into_owned()));
    let indexer = Indexer::new(config)?;

    let paths = walker::collect_paths(&root, config)?;
    info!("Ingesting {} files from {} as {repo_id}", paths.len(), root.display());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("█▓░"),
    );
    let mut files = Vec::with_capacity(paths.len());
    for rel in &paths {
        pb.set_message(rel.clone());
        match walker::read_source_file(&root, rel) {
            Ok(file) => files.push(file),
            Err(e) => warn!("{e:#}"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let (snapshot, report) = indexer.index_files(&repo_id, &root, &files);
    let mut cache = GraphCache::open(&config.cache_dir)?;
    cache.store(snapshot)?;
    info!("Cached {repo_id} in {}", cache.dir().display());
    print_json(&report)
}

fn validate(answer: &str, chunks: &Path) -> Result<()> {
    let text = if answer == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read answer from stdin")?;
        buf
    } else {
        std::fs::read_to_string(answer).with_context(|| format!("failed to read answer: {answer}"))?
    };

    let data = std::fs::read_to_string(chunks)
        .with_context(|| format!("failed to read chunks: {}", chunks.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&data).context("chunks must be a JSON array")?;

    let citations = CitationParser::new().parse(&text);
    let report = citation::validate(&citations, &chunks);
    if report.under_grounded {
        warn!("Answer contains no citations");
    }
    print_json(&report)
}

fn load_snapshot<'a>(cache: &'a mut GraphCache, repo_id: &str) -> Result<&'a RepoSnapshot> {
    cache
        .load(repo_id)?
        .with_context(|| format!("no snapshot for {repo_id}; run `atlas ingest` first"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed to serialize output")?);
    Ok(())
}
