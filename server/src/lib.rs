use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Args;
use lexi_core::embeddings::parse_query_embedding;
use lexi_core::{BuildReport, DocId, EngineConfig, HybridSearcher, LexiconIndex, ScoredDocument};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 5000;
const MAX_K: usize = 100;

/// Engine configuration flags: an optional JSON file plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Engine configuration JSON
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Embedding dimension
    #[arg(long)]
    pub dim: Option<usize>,
    /// ANN neighbours per query
    #[arg(long)]
    pub k: Option<usize>,
    /// Lexical weight
    #[arg(long)]
    pub alpha: Option<f32>,
    /// Vector weight
    #[arg(long)]
    pub beta: Option<f32>,
}

impl EngineArgs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dim) = self.dim {
            config.dim = dim;
        }
        if let Some(k) = self.k {
            config.search.k = k;
        }
        if let Some(alpha) = self.alpha {
            config.search.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.search.beta = beta;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Everything needed to build the index and serve it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub corpus: PathBuf,
    pub embeddings: PathBuf,
    pub engine: EngineConfig,
    /// External embedding generator; the query text is appended as its last argument.
    pub embed_cmd: Option<String>,
    pub embed_timeout: Duration,
}

#[derive(Deserialize)]
pub struct CombinedParams {
    pub search: Option<String>,
    pub embedding: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    pub embedding: Option<String>,
}
fn default_k() -> usize {
    10
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    pub score: f32,
    pub lexical_score: f32,
    pub vector_score: f32,
    pub matched_terms: Vec<String>,
}

impl From<ScoredDocument> for SearchHit {
    fn from(doc: ScoredDocument) -> Self {
        Self {
            doc_id: doc.doc_id,
            title: doc.title,
            url: doc.url,
            score: doc.score,
            lexical_score: doc.signals.lexical,
            vector_score: doc.signals.vector,
            matched_terms: doc.signals.matched_terms,
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse<'a> {
    pub started_at: &'a str,
    pub dim: usize,
    pub report: &'a BuildReport,
}

/// Runs the configured embedding command for query texts without an embedding.
#[derive(Debug)]
pub struct Embedder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Embedder {
    pub fn new(cmd: &str, timeout: Duration) -> Option<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect(), timeout })
    }

    /// Embed `text`, or `None` when the command fails, times out or prints no floats.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .output();
        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(program = %self.program, error = %e, "embedding command failed to run");
                return None;
            }
            Err(_) => {
                tracing::warn!(program = %self.program, timeout_ms = self.timeout.as_millis() as u64, "embedding command timed out");
                return None;
            }
        };
        if !output.status.success() {
            tracing::warn!(program = %self.program, status = %output.status, "embedding command exited with failure");
            return None;
        }
        let vector = parse_query_embedding(&String::from_utf8_lossy(&output.stdout));
        if vector.is_empty() {
            tracing::warn!(program = %self.program, "embedding command produced no floats");
            return None;
        }
        Some(vector)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub searcher: HybridSearcher,
    pub embedder: Option<Arc<Embedder>>,
    pub started_at: Arc<str>,
}

impl AppState {
    /// An explicit embedding wins; otherwise ask the embedder, else go lexical-only.
    async fn query_vector(&self, text: &str, embedding: Option<&str>) -> Vec<f32> {
        if let Some(csv) = embedding {
            return parse_query_embedding(csv);
        }
        match &self.embedder {
            Some(embedder) if !text.trim().is_empty() => embedder.embed(text).await.unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

pub fn build_app(config: AppConfig) -> Result<Router> {
    let index = LexiconIndex::build(&config.corpus, &config.embeddings, config.engine.clone())
        .with_context(|| format!("building index from {}", config.corpus.display()))?;
    let report = index.report();
    tracing::info!(
        documents = report.documents_indexed,
        terms = report.distinct_terms,
        vectors = report.vectors_indexed,
        "index ready"
    );

    let started_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let embedder = config
        .embed_cmd
        .as_deref()
        .and_then(|cmd| Embedder::new(cmd, config.embed_timeout))
        .map(Arc::new);
    let app_state = AppState { searcher: HybridSearcher::new(Arc::new(index)), embedder, started_at: started_at.into() };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/s", get(combined_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn combined_handler(
    State(state): State<AppState>,
    Query(params): Query<CombinedParams>,
) -> Result<Json<Vec<ScoredDocument>>, (StatusCode, String)> {
    let Some(text) = params.search else {
        return Err((StatusCode::BAD_REQUEST, "missing required query parameter: search".into()));
    };
    let vector = state.query_vector(&text, params.embedding.as_deref()).await;
    Ok(Json(state.searcher.search(&text, &vector)))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let vector = state.query_vector(&params.q, params.embedding.as_deref()).await;
    let ranked = state.searcher.search(&params.q, &vector);
    let total_hits = ranked.len();
    let k = params.k.clamp(1, MAX_K);
    let results = ranked.into_iter().take(k).map(SearchHit::from).collect();
    Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Response {
    match state.searcher.index().get_document(doc_id) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response(),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Response {
    let index = state.searcher.index();
    Json(StatsResponse { started_at: &state.started_at, dim: index.config().dim, report: index.report() }).into_response()
}
