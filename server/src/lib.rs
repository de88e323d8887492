use agro_core::corpus::{builtin_corpus, load_corpus};
use agro_core::persist::{load_index, IndexPaths};
use agro_core::{CorpusEntry, Index, QueryParams, TokenizerOptions};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod services;

use services::{Disabled, SpeechSynthesizer, Translator};

/// Language the corpus is written in.
pub const BASE_LANG: &str = "en";
const MAX_K: usize = 20;

#[derive(Deserialize)]
pub struct AskParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    pub threshold: Option<f32>,
    /// Language of the question and of the answers; omitted means English.
    pub lang: Option<String>,
}
fn default_k() -> usize { 1 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Skipped,
    Ok,
    Unavailable,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub query: String,
    pub query_en: String,
    pub lang: Option<String>,
    pub matched: bool,
    pub took_s: f64,
    pub translation: TranslationStatus,
    pub results: Vec<Answer>,
}

#[derive(Serialize)]
pub struct Answer {
    pub key: String,
    /// Corpus text in the base language.
    pub text: String,
    /// Text in the requested language, or `text` when not translated.
    pub answer: String,
    pub score: f32,
}

#[derive(Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    pub lang: String,
}

/// Where the served index comes from; also what `/admin/reload` rebuilds from.
#[derive(Debug, Clone)]
pub enum CorpusSource {
    Builtin,
    Corpus(PathBuf),
    Snapshot(PathBuf),
}

impl CorpusSource {
    pub fn load(&self, options: TokenizerOptions) -> Result<Index> {
        let index = match self {
            CorpusSource::Builtin => Index::build_with(builtin_corpus(), options)?,
            CorpusSource::Corpus(path) => Index::build_with(load_corpus(path)?, options)?,
            CorpusSource::Snapshot(dir) => load_index(&IndexPaths::new(dir))?,
        };
        Ok(index)
    }
}

pub struct ServerConfig {
    pub source: CorpusSource,
    pub options: TokenizerOptions,
    pub default_threshold: f32,
    pub admin_token: Option<String>,
    /// Comma-separated allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            source: CorpusSource::Builtin,
            options: TokenizerOptions::default(),
            default_threshold: 0.0,
            admin_token: None,
            cors_allow_origin: None,
        }
    }
}

pub struct Collaborators {
    pub translator: Arc<dyn Translator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self { translator: Arc::new(Disabled), speech: Arc::new(Disabled) }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RwLock<Arc<Index>>>,
    pub source: Arc<CorpusSource>,
    pub options: TokenizerOptions,
    pub default_threshold: f32,
    pub admin_token: Option<String>,
    pub translator: Arc<dyn Translator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl AppState {
    fn current_index(&self) -> Arc<Index> {
        self.index.read().clone()
    }
}

pub fn build_app(config: ServerConfig, collaborators: Collaborators) -> Result<Router> {
    // Build once at startup; handlers share it read-only
    let index = config.source.load(config.options)?;
    tracing::info!(source = ?config.source, entries = index.len(), terms = index.vocabulary().len(), "index ready");

    let app_state = AppState {
        index: Arc::new(RwLock::new(Arc::new(index))),
        source: Arc::new(config.source),
        options: config.options,
        default_threshold: config.default_threshold,
        admin_token: config.admin_token,
        translator: collaborators.translator,
        speech: collaborators.speech,
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ask", get(ask_handler))
        .route("/speak", post(speak_handler))
        .route("/entry/:key", get(entry_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors_layer(config.cors_allow_origin.as_deref()))
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub async fn ask_handler(State(state): State<AppState>, Query(params): Query<AskParams>) -> Json<AskResponse> {
    let start = std::time::Instant::now();
    let lang = params
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case(BASE_LANG))
        .map(str::to_string);

    let mut translation = TranslationStatus::Skipped;
    let query_en = match &lang {
        Some(l) if !params.q.trim().is_empty() => match state.translator.translate(&params.q, l, BASE_LANG).await {
            Ok(text) => {
                translation = TranslationStatus::Ok;
                text
            }
            Err(err) => {
                tracing::warn!(lang = %l, error = %err, "question translation failed, matching untranslated text");
                translation = TranslationStatus::Unavailable;
                params.q.clone()
            }
        },
        _ => params.q.clone(),
    };

    let query = QueryParams {
        top_k: params.k.clamp(1, MAX_K),
        threshold: params.threshold.unwrap_or(state.default_threshold),
    };
    let hits: Vec<(CorpusEntry, f32)> = state
        .current_index()
        .query(&query_en, query)
        .into_iter()
        .map(|m| (m.entry.clone(), m.score))
        .collect();

    let mut results = Vec::with_capacity(hits.len());
    for (entry, score) in hits {
        let mut answer = entry.text.clone();
        if let Some(l) = &lang {
            if translation != TranslationStatus::Unavailable {
                match state.translator.translate(&entry.text, BASE_LANG, l).await {
                    Ok(text) => {
                        answer = text;
                        translation = TranslationStatus::Ok;
                    }
                    Err(err) => {
                        tracing::warn!(lang = %l, key = %entry.key, error = %err, "answer translation failed");
                        translation = TranslationStatus::Unavailable;
                    }
                }
            }
        }
        results.push(Answer { key: entry.key, text: entry.text, answer, score });
    }

    let elapsed = start.elapsed();
    tracing::debug!(query = %query_en, hits = results.len(), "answered");
    Json(AskResponse {
        query: params.q,
        query_en,
        lang,
        matched: !results.is_empty(),
        took_s: elapsed.as_secs_f64(),
        translation,
        results,
    })
}

pub async fn speak_handler(State(state): State<AppState>, Json(req): Json<SpeakRequest>) -> Response {
    if req.text.trim().is_empty() || req.lang.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text and lang are required");
    }
    match state.speech.synthesize(&req.text, req.lang.trim()).await {
        Ok(audio) => ([(header::CONTENT_TYPE, audio.content_type)], audio.bytes).into_response(),
        Err(err) => {
            tracing::warn!(lang = %req.lang, error = %err, "speech synthesis failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, &err.to_string())
        }
    }
}

pub async fn entry_handler(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let index = state.current_index();
    match index.entry(&key) {
        Some(entry) => Json(serde_json::json!({ "key": entry.key, "text": entry.text })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let source = state.source.clone();
    let options = state.options;
    let rebuilt = tokio::task::spawn_blocking(move || source.load(options))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let index = match rebuilt {
        Ok(index) => index,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "reload failed, keeping current index");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")));
        }
    };
    let (entries, terms) = (index.len(), index.vocabulary().len());
    *state.index.write() = Arc::new(index);
    tracing::info!(entries, terms, "index reloaded");
    Ok(Json(serde_json::json!({ "entries": entries, "terms": terms })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
