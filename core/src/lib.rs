//! Hybrid lexical + semantic search over dictionary entries (lexemes).
//!
//! The index is built once by [`IndexBuilder`] and then served read-only
//! through [`HybridSearcher`].

pub mod builder;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod forward;
pub mod index;
pub mod inverted;
pub mod searcher;
pub mod tokenizer;
pub mod vector;

pub use builder::{BuildReport, IndexBuilder, LexiconIndex};
pub use config::{EngineConfig, HnswConfig, SearchConfig, TokenizerConfig, VectorNormalization, WeightConfig};
pub use error::{BuildError, VectorError};
pub use index::{DocId, Document, Posting, PostingList, ScoreSignals, ScoredDocument, VectorMatch};
pub use searcher::{CombinedResult, HybridSearcher, LexicalHit};
