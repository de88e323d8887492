use agro_core::corpus::{is_corpus_file, load_corpus};
use agro_core::persist::{load_index, save_index, IndexPaths};
use agro_core::{CorpusEntry, Index, QueryParams, TokenizerOptions};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "agro-indexer")]
#[command(about = "Build and query TF-IDF indexes over farming Q&A corpora", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index snapshot from CSV/JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        #[command(flatten)]
        analyzer: AnalyzerArgs,
    },
    /// Rank corpus entries against a question
    Query {
        /// Index directory written by `build`
        #[arg(long, conflicts_with = "corpus", required_unless_present = "corpus")]
        index: Option<String>,
        /// Corpus file to index in memory instead of loading a snapshot
        #[arg(long)]
        corpus: Option<String>,
        #[command(flatten)]
        analyzer: AnalyzerArgs,
        /// Question text
        #[arg(long)]
        q: String,
        /// Number of results
        #[arg(long, default_value_t = 1)]
        k: usize,
        /// Minimum cosine similarity for a result
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },
}

#[derive(Args)]
struct AnalyzerArgs {
    /// Longest n-gram to index (1 or 2)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    ngram_max: u8,
    /// Drop common English stop words
    #[arg(long, default_value_t = false)]
    stop_words: bool,
    /// Apply English stemming
    #[arg(long, default_value_t = false)]
    stem: bool,
}

impl AnalyzerArgs {
    fn options(&self) -> TokenizerOptions {
        TokenizerOptions { ngram_max: self.ngram_max as usize, stop_words: self.stop_words, stem: self.stem }
    }
}

#[derive(Serialize)]
struct Hit<'a> {
    rank: usize,
    key: &'a str,
    score: f32,
    text: &'a str,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, analyzer } => {
            build_index(&input, &output, analyzer.options())
        }
        Commands::Query { index, corpus, analyzer, q, k, threshold } => {
            let index = match (index, corpus) {
                (Some(dir), _) => load_index(&IndexPaths::new(dir))?,
                (None, Some(file)) => Index::build_with(load_corpus(Path::new(&file))?, analyzer.options())?,
                (None, None) => bail!("either --index or --corpus is required"),
            };
            run_query(&index, &q, k, threshold)
        }
    }
}

fn build_index(input: &str, output: &str, options: TokenizerOptions) -> Result<()> {
    let corpus = load_inputs(Path::new(input))?;
    tracing::info!(entries = corpus.len(), "ingested corpus");

    let index = Index::build_with(corpus, options)?;
    let meta = save_index(&IndexPaths::new(output), &index)?;
    tracing::info!(output, num_entries = meta.num_entries, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

/// Every corpus file under `input`, concatenated in sorted path order.
fn load_inputs(input: &Path) -> Result<Vec<CorpusEntry>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", input.display()))?;
            let p = entry.path();
            if p.is_file() && is_corpus_file(p) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut corpus = Vec::new();
    for file in files {
        corpus.extend(load_corpus(&file)?);
    }
    Ok(corpus)
}

fn run_query(index: &Index, q: &str, k: usize, threshold: f32) -> Result<()> {
    let hits = index.query(q, QueryParams { top_k: k, threshold });
    if hits.is_empty() {
        println!("{}", serde_json::json!({ "query": q, "matched": false }));
        return Ok(());
    }
    for (rank, m) in hits.iter().enumerate() {
        let hit = Hit { rank: rank + 1, key: &m.entry.key, score: m.score, text: &m.entry.text };
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}
