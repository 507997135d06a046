//! Hybrid retrieval: weighted keyword postings fused with ANN similarity.
//!
//! Each call works only on local maps, so one searcher can serve any number of
//! threads at once.

use crate::builder::LexiconIndex;
use crate::config::{SearchConfig, VectorNormalization};
use crate::index::{DocId, ScoreSignals, ScoredDocument, VectorMatch};
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregated lexical evidence for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalHit {
    pub weight: u64,
    pub matched_terms: Vec<String>,
}

/// A fused, not yet enriched, ranking entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedResult {
    pub doc_id: DocId,
    pub score: f32,
    pub signals: ScoreSignals,
}

#[derive(Debug, Clone)]
pub struct HybridSearcher {
    index: Arc<LexiconIndex>,
    config: SearchConfig,
}

impl HybridSearcher {
    /// Use the search settings the index was built with.
    pub fn new(index: Arc<LexiconIndex>) -> Self {
        let config = index.config().search.clone();
        Self { index, config }
    }

    pub fn with_config(index: Arc<LexiconIndex>, config: SearchConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &LexiconIndex {
        &self.index
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Sum posting weights per document over every query term. A repeated
    /// term adds its weight once per occurrence.
    pub fn lexical_candidates(&self, query: &str) -> HashMap<DocId, LexicalHit> {
        let mut hits: HashMap<DocId, LexicalHit> = HashMap::new();
        for term in self.index.analyzer().terms(query) {
            let Some(postings) = self.index.postings(&term) else { continue };
            for p in postings {
                let hit = hits.entry(p.doc_id).or_default();
                hit.weight += u64::from(p.weight);
                if !hit.matched_terms.contains(&p.term) {
                    hit.matched_terms.push(p.term.clone());
                }
            }
        }
        hits
    }

    /// ANN neighbours of `query_vector`. Empty or wrong-dimension queries yield nothing.
    pub fn vector_candidates(&self, query_vector: &[f32]) -> Vec<VectorMatch> {
        if query_vector.is_empty() {
            return Vec::new();
        }
        match self.index.vectors().search(query_vector, self.config.k) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(error = %err, "query vector rejected, skipping vector retrieval");
                Vec::new()
            }
        }
    }

    /// Normalize, fuse and rank both candidate sets. Ties go to the lower doc_id.
    pub fn rank(&self, query: &str, query_vector: &[f32]) -> Vec<CombinedResult> {
        let lexical = self.lexical_candidates(query);
        let vector = self.vector_candidates(query_vector);

        let max_inv = lexical.values().map(|h| h.weight).max().unwrap_or(0);
        let vector_scale = match self.config.vector_normalization {
            VectorNormalization::Raw => 1.0,
            VectorNormalization::Max => {
                let max_sim = vector.iter().map(|m| m.similarity).fold(f32::NEG_INFINITY, f32::max);
                if max_sim > 0.0 {
                    1.0 / max_sim
                } else {
                    1.0
                }
            }
        };

        let mut signals: HashMap<DocId, ScoreSignals> = HashMap::with_capacity(lexical.len() + vector.len());
        for (doc_id, hit) in lexical {
            let score = if max_inv > 0 { hit.weight as f32 / max_inv as f32 } else { 0.0 };
            let s = signals.entry(doc_id).or_default();
            s.lexical = score;
            s.matched_terms = hit.matched_terms;
        }
        for m in vector {
            signals.entry(m.doc_id).or_default().vector = m.similarity * vector_scale;
        }

        let (alpha, beta) = (self.config.alpha, self.config.beta);
        let mut combined: Vec<CombinedResult> = signals
            .into_iter()
            .map(|(doc_id, signals)| CombinedResult {
                doc_id,
                score: alpha * signals.lexical + beta * signals.vector,
                signals,
            })
            .collect();
        combined.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
        if let Some(limit) = self.config.limit {
            combined.truncate(limit);
        }
        combined
    }

    /// Ranked results enriched from the forward index.
    pub fn search(&self, query: &str, query_vector: &[f32]) -> Vec<ScoredDocument> {
        self.rank(query, query_vector)
            .into_iter()
            .filter_map(|r| {
                let Some(doc) = self.index.get_document(r.doc_id) else {
                    tracing::warn!(doc_id = r.doc_id, "ranked doc_id missing from forward index");
                    return None;
                };
                Some(ScoredDocument {
                    doc_id: r.doc_id,
                    title: doc.title.clone(),
                    language: doc.language.clone(),
                    forms: doc.forms.clone(),
                    senses: doc.senses.clone(),
                    url: doc.url.clone(),
                    score: r.score,
                    signals: r.signals,
                })
            })
            .collect()
    }

    /// `search` serialized as a pretty-printed JSON array of
    /// `{title, language, forms, senses, url, score}`.
    pub fn search_json(&self, query: &str, query_vector: &[f32]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.search(query, query_vector))
    }
}
