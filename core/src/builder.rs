//! One-shot index construction: corpus -> forward + inverted index,
//! embeddings file -> document vectors, vectors -> HNSW graph.

use crate::config::EngineConfig;
use crate::corpus::{parse_lexeme_id, read_corpus, RawEntry};
use crate::embeddings::{parse_embedding_line, LineError};
use crate::error::BuildError;
use crate::forward::ForwardIndex;
use crate::index::{DocId, Document, PostingList};
use crate::inverted::InvertedIndex;
use crate::tokenizer::{Analyzer, Tokenizer};
use crate::vector::AnnIndex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

const VECTOR_PROGRESS_EVERY: usize = 5000;

/// Counters for everything the build skipped, replaced or fell back on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub entries_seen: usize,
    pub documents_indexed: usize,
    /// Entries without an English headword, or not shaped like an entry at all.
    pub skipped_entries: usize,
    /// Entries whose doc_id came from the sequence counter.
    pub fallback_ids: usize,
    /// Overwrites where either side got its id from the sequence counter.
    pub fallback_collisions: usize,
    /// Insertions that replaced an existing document.
    pub duplicate_ids: usize,
    pub distinct_terms: usize,
    pub postings: usize,
    pub embedding_lines: usize,
    pub vectors_attached: usize,
    pub embedding_bad_ids: usize,
    pub embedding_bad_lines: usize,
    pub embedding_unknown_ids: usize,
    pub dimension_mismatches: usize,
    pub non_finite_vectors: usize,
    pub vectors_indexed: usize,
}

/// The immutable index triple plus the analyzer and config it was built with.
#[derive(Debug)]
pub struct LexiconIndex {
    forward: ForwardIndex,
    inverted: InvertedIndex,
    vectors: AnnIndex,
    analyzer: Analyzer,
    config: EngineConfig,
    report: BuildReport,
}

impl LexiconIndex {
    /// Build with the default tokenizer.
    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(corpus: P, embeddings: Q, config: EngineConfig) -> Result<Self, BuildError> {
        IndexBuilder::new(config).build(corpus, embeddings)
    }

    pub fn get_document(&self, doc_id: DocId) -> Option<&Document> {
        self.forward.get(doc_id)
    }

    /// Posting list for a normalized term.
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.inverted.get(term)
    }

    pub fn forward(&self) -> &ForwardIndex {
        &self.forward
    }

    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    pub fn vectors(&self) -> &AnnIndex {
        &self.vectors
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }
}

/// Consumed by [`IndexBuilder::build`], so a builder cannot run twice.
pub struct IndexBuilder {
    config: EngineConfig,
    analyzer: Analyzer,
}

impl IndexBuilder {
    pub fn new(config: EngineConfig) -> Self {
        let analyzer = Analyzer::new(config.tokenizer);
        Self { config, analyzer }
    }

    /// Swap in an external segmenter. Normalization stays the engine's.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.analyzer = Analyzer::with_tokenizer(tokenizer, self.config.tokenizer);
        self
    }

    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(self, corpus: P, embeddings: Q) -> Result<LexiconIndex, BuildError> {
        self.config.validate()?;
        let corpus = corpus.as_ref();
        let embeddings = embeddings.as_ref();
        let mut report = BuildReport::default();

        let entries = read_corpus(corpus)?;
        let (mut forward, inverted) = self.index_entries(entries, &mut report);
        if forward.is_empty() {
            return Err(BuildError::EmptyCorpus { path: corpus.to_path_buf() });
        }
        tracing::info!(
            documents = forward.len(),
            terms = inverted.num_terms(),
            skipped = report.skipped_entries,
            fallback_ids = report.fallback_ids,
            "forward and inverted index built"
        );

        self.load_embeddings(embeddings, &mut forward, &mut report)?;
        let vectors = self.build_vector_index(&forward, &mut report)?;

        report.documents_indexed = forward.len();
        report.distinct_terms = inverted.num_terms();
        report.postings = inverted.num_postings();
        tracing::info!(
            documents = report.documents_indexed,
            terms = report.distinct_terms,
            vectors_attached = report.vectors_attached,
            vectors_indexed = report.vectors_indexed,
            "index build complete"
        );

        Ok(LexiconIndex { forward, inverted, vectors, analyzer: self.analyzer, config: self.config, report })
    }

    fn index_entries(&self, entries: Vec<serde_json::Value>, report: &mut BuildReport) -> (ForwardIndex, InvertedIndex) {
        let mut forward = ForwardIndex::new();
        let mut inverted = InvertedIndex::new();
        let mut fallback_assigned: HashSet<DocId> = HashSet::new();
        let mut seq: DocId = 0;

        for (position, value) in entries.into_iter().enumerate() {
            report.entries_seen += 1;
            let entry: RawEntry = match serde_json::from_value(value) {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(position, error = %err, "skipping malformed corpus entry");
                    report.skipped_entries += 1;
                    continue;
                }
            };

            let parsed = entry.id.as_deref().and_then(parse_lexeme_id);
            let (doc_id, is_fallback) = match parsed {
                Some(id) => (id, false),
                None => {
                    tracing::debug!(position, id = ?entry.id, fallback = seq, "using sequence counter as doc_id");
                    (seq, true)
                }
            };

            let Some(doc) = entry.to_document(doc_id) else {
                tracing::debug!(position, id = ?entry.id, "skipping entry without English headword");
                report.skipped_entries += 1;
                continue;
            };
            seq += 1;
            if is_fallback {
                report.fallback_ids += 1;
            }

            if forward.insert(doc).is_some() {
                report.duplicate_ids += 1;
                if is_fallback || fallback_assigned.contains(&doc_id) {
                    report.fallback_collisions += 1;
                }
                tracing::warn!(doc_id, is_fallback, "duplicate doc_id, later entry replaces earlier one");
            }
            if is_fallback {
                fallback_assigned.insert(doc_id);
            }

            if let Some(doc) = forward.get(doc_id) {
                inverted.index_document(doc, &self.analyzer, self.config.weights);
            }
        }
        (forward, inverted)
    }

    fn load_embeddings(&self, path: &Path, forward: &mut ForwardIndex, report: &mut BuildReport) -> Result<(), BuildError> {
        let io_err = |source| BuildError::Io { path: path.to_path_buf(), source };
        let reader = BufReader::new(File::open(path).map_err(io_err)?);

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            report.embedding_lines += 1;

            let parsed = match parse_embedding_line(&line) {
                Ok(p) => p,
                Err(err) => {
                    match err {
                        LineError::BadId(_) => report.embedding_bad_ids += 1,
                        LineError::MissingFields | LineError::BadFloat(_) => report.embedding_bad_lines += 1,
                    }
                    tracing::warn!(line = line_no, error = %err, "skipping embedding line");
                    continue;
                }
            };

            if !forward.contains(parsed.doc_id) {
                report.embedding_unknown_ids += 1;
                tracing::debug!(line = line_no, doc_id = parsed.doc_id, "embedding for unknown doc_id");
                continue;
            }
            if parsed.vector.len() != self.config.dim {
                report.dimension_mismatches += 1;
                tracing::warn!(
                    line = line_no,
                    doc_id = parsed.doc_id,
                    expected = self.config.dim,
                    actual = parsed.vector.len(),
                    "embedding dimension mismatch, document stays lexical-only"
                );
                forward.set_vector(parsed.doc_id, None);
                continue;
            }
            forward.set_vector(parsed.doc_id, Some(parsed.vector));
            report.vectors_attached += 1;
        }
        tracing::info!(path = %path.display(), lines = report.embedding_lines, attached = report.vectors_attached, "embeddings loaded");
        Ok(())
    }

    fn build_vector_index(&self, forward: &ForwardIndex, report: &mut BuildReport) -> Result<AnnIndex, BuildError> {
        if forward.is_empty() {
            return Err(BuildError::EmptyForwardIndex);
        }
        let capacity = forward.iter().filter(|d| d.vector.is_some()).count();
        let mut ann = AnnIndex::new(self.config.dim, capacity, self.config.hnsw)?;

        for doc in forward.sorted() {
            let Some(vector) = doc.vector.as_deref() else { continue };
            match ann.insert(doc.doc_id, vector) {
                Ok(()) => {
                    report.vectors_indexed += 1;
                    if report.vectors_indexed % VECTOR_PROGRESS_EVERY == 0 {
                        tracing::debug!(indexed = report.vectors_indexed, "building vector index");
                    }
                }
                Err(crate::error::VectorError::DimensionMismatch { expected, actual }) => {
                    report.dimension_mismatches += 1;
                    tracing::warn!(doc_id = doc.doc_id, expected, actual, "vector dimension mismatch, not indexed");
                }
                Err(err) => {
                    report.non_finite_vectors += 1;
                    tracing::warn!(doc_id = doc.doc_id, error = %err, "vector not indexed");
                }
            }
        }
        Ok(ann)
    }
}
