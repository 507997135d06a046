use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lexi_core::corpus::{RawEntry, SimplifiedLexeme};
use lexi_core::embeddings::parse_query_embedding;
use lexi_core::{EngineConfig, HybridSearcher, LexiconIndex};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROGRESS_EVERY: usize = 1000;
const INIT_MARKER: &str = "###INITEND###";
const END_MARKER: &str = "###END###";

#[derive(Parser)]
#[command(name = "lexi")]
#[command(about = "Build and query a hybrid lexical + vector lexeme index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a line-delimited Wikidata lexeme dump into the simplified corpus array
    Simplify {
        /// Input path (file or directory of .json/.jsonl files)
        #[arg(long)]
        input: String,
        /// Output corpus file
        #[arg(long)]
        output: String,
    },
    /// Build the index and print the build report
    Build {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Build the index and run one query
    Query {
        #[command(flatten)]
        index: IndexArgs,
        /// Query text
        #[arg(long, default_value = "")]
        text: String,
        /// Query embedding as comma-separated floats
        #[arg(long, default_value = "")]
        embedding: String,
    },
    /// Build the index, then answer JSON queries from stdin
    Repl {
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Corpus JSON array
    #[arg(long)]
    corpus: PathBuf,
    /// Embeddings file (id<TAB>label<TAB>floats)
    #[arg(long)]
    embeddings: PathBuf,
    /// Engine configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Embedding dimension
    #[arg(long)]
    dim: Option<usize>,
    /// ANN neighbours per query
    #[arg(long)]
    k: Option<usize>,
    /// Lexical weight
    #[arg(long)]
    alpha: Option<f32>,
    /// Vector weight
    #[arg(long)]
    beta: Option<f32>,
}

impl IndexArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
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
        Ok(config)
    }

    fn build(&self) -> Result<LexiconIndex> {
        let config = self.engine_config()?;
        let index = LexiconIndex::build(&self.corpus, &self.embeddings, config)
            .with_context(|| format!("building index from {}", self.corpus.display()))?;
        Ok(index)
    }

    fn searcher(&self) -> Result<HybridSearcher> {
        Ok(HybridSearcher::new(Arc::new(self.build()?)))
    }
}

#[derive(Debug, Deserialize)]
struct ReplQuery {
    #[serde(default)]
    input_text: String,
    #[serde(default)]
    embedding: String,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simplify { input, output } => simplify(&input, &output),
        Commands::Build { index } => {
            let index = index.build()?;
            println!("{}", serde_json::to_string_pretty(index.report())?);
            Ok(())
        }
        Commands::Query { index, text, embedding } => {
            let searcher = index.searcher()?;
            let vector = parse_query_embedding(&embedding);
            println!("{}", searcher.search_json(&text, &vector)?);
            Ok(())
        }
        Commands::Repl { index } => repl(index.searcher()?),
    }
}

fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn simplify(input: &str, output: &str) -> Result<()> {
    let files = collect_inputs(Path::new(input));
    if files.is_empty() {
        anyhow::bail!("no .json/.jsonl input found at {input}");
    }

    let mut processed = 0usize;
    let mut kept: Vec<SimplifiedLexeme> = Vec::new();
    for file in files {
        let reader = BufReader::new(File::open(&file).with_context(|| format!("opening {}", file.display()))?);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim().trim_end_matches(',');
            if line.is_empty() || line == "[" || line == "]" {
                continue;
            }
            processed += 1;
            if processed % PROGRESS_EVERY == 0 {
                tracing::info!(processed, kept = kept.len(), "simplifying");
            }
            match serde_json::from_str::<RawEntry>(line) {
                Ok(entry) => kept.extend(entry.simplify()),
                Err(e) => tracing::warn!(file = %file.display(), line = lineno + 1, error = %e, "skipping unparsable lexeme"),
            }
        }
    }

    let mut out = BufWriter::new(File::create(output).with_context(|| format!("creating {output}"))?);
    serde_json::to_writer_pretty(&mut out, &kept)?;
    out.flush()?;
    tracing::info!(processed, kept = kept.len(), output, "simplify complete");
    Ok(())
}

fn repl(searcher: HybridSearcher) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{INIT_MARKER}")?;
    out.flush()?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let query: ReplQuery = match serde_json::from_str(&line) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparsable query line");
                continue;
            }
        };
        let vector = parse_query_embedding(&query.embedding);
        writeln!(out, "{}", searcher.search_json(&query.input_text, &vector)?)?;
        writeln!(out, "{END_MARKER}")?;
        out.flush()?;
    }
    Ok(())
}
