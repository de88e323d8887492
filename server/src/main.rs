use agro_core::TokenizerOptions;
use agro_server::services::{Disabled, HttpSpeech, HttpTranslator, SpeechSynthesizer, Translator};
use agro_server::{build_app, Collaborators, CorpusSource, ServerConfig};
use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Corpus file (.csv, .json, .jsonl) to index at startup
    #[arg(long, conflicts_with = "index")]
    corpus: Option<PathBuf>,
    /// Index snapshot directory written by agro-indexer
    #[arg(long)]
    index: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Base URL of a LibreTranslate-compatible translation service
    #[arg(long)]
    translate_url: Option<String>,
    /// Base URL of a speech synthesis service
    #[arg(long)]
    speech_url: Option<String>,
    /// Timeout for translation and speech requests
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Default minimum score for /ask
    #[arg(long, default_value_t = 0.0)]
    threshold: f32,
    /// Longest n-gram to index (1 or 2); ignored for snapshots
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    ngram_max: u8,
    /// Drop common English stop words; ignored for snapshots
    #[arg(long, default_value_t = false)]
    stop_words: bool,
    /// Apply English stemming; ignored for snapshots
    #[arg(long, default_value_t = false)]
    stem: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let source = match (args.corpus, args.index) {
        (Some(path), _) => CorpusSource::Corpus(path),
        (None, Some(dir)) => CorpusSource::Snapshot(dir),
        (None, None) => CorpusSource::Builtin,
    };
    let config = ServerConfig {
        source,
        options: TokenizerOptions { ngram_max: args.ngram_max as usize, stop_words: args.stop_words, stem: args.stem },
        default_threshold: args.threshold,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
        cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
    };

    let timeout = Duration::from_secs(args.timeout_secs);
    let translator: Arc<dyn Translator> = match &args.translate_url {
        Some(url) => Arc::new(HttpTranslator::new(url, timeout)?),
        None => Arc::new(Disabled),
    };
    let speech: Arc<dyn SpeechSynthesizer> = match &args.speech_url {
        Some(url) => Arc::new(HttpSpeech::new(url, timeout)?),
        None => Arc::new(Disabled),
    };
    tracing::info!(translation = args.translate_url.is_some(), speech = args.speech_url.is_some(), "collaborators configured");

    let app: Router = build_app(config, Collaborators { translator, speech })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
