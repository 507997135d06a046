use serde::{Deserialize, Serialize};

pub type DocId = u64;

/// One dictionary entry as held by the forward index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    /// Canonical headword (the lemma).
    pub title: String,
    pub language: String,
    /// Inflected forms, space-joined.
    pub forms: String,
    /// Glosses, semicolon-joined.
    pub senses: String,
    pub url: String,
    /// Only set when the loaded embedding has the configured dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term: String,
    /// `title_boost * title_count + body_weight * form_count`
    pub weight: u32,
}

/// Postings for one term in insertion order. Consumers aggregate, order carries no meaning.
pub type PostingList = Vec<Posting>;

/// Output of an ANN query. `similarity` is `1 - distance` and may fall outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VectorMatch {
    pub doc_id: DocId,
    pub similarity: f32,
}

/// Per-document signals that produced a fused score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSignals {
    pub lexical: f32,
    pub vector: f32,
    pub matched_terms: Vec<String>,
}

/// A ranked, enriched search hit. Serializes to the six public result fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    #[serde(skip)]
    pub doc_id: DocId,
    pub title: String,
    pub language: String,
    pub forms: String,
    pub senses: String,
    pub url: String,
    pub score: f32,
    #[serde(skip)]
    pub signals: ScoreSignals,
}
