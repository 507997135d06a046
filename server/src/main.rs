use anyhow::Result;
use axum::Router;
use clap::Parser;
use lexi_server::{build_app, AppConfig, EngineArgs, DEFAULT_EMBED_TIMEOUT_MS};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus JSON array
    #[arg(long)]
    corpus: PathBuf,
    /// Embeddings file (id<TAB>label<TAB>floats)
    #[arg(long)]
    embeddings: PathBuf,
    #[command(flatten)]
    engine: EngineArgs,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Command that prints an embedding for the text given as its last argument
    #[arg(long)]
    embed_cmd: Option<String>,
    /// Embedding command timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_EMBED_TIMEOUT_MS)]
    embed_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let engine = args.engine.engine_config()?;
    let config = AppConfig {
        corpus: args.corpus,
        embeddings: args.embeddings,
        engine,
        embed_cmd: args.embed_cmd,
        embed_timeout: Duration::from_millis(args.embed_timeout_ms),
    };
    let app: Router = tokio::task::spawn_blocking(move || build_app(config)).await??;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
