//! Engine configuration. Every ranking constant lives here so it can be tuned
//! and tested instead of being baked into the algorithms.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_DIM: usize = 384;
pub const DEFAULT_TITLE_BOOST: u32 = 10;
pub const DEFAULT_BODY_WEIGHT: u32 = 1;
pub const DEFAULT_K: usize = 20;
pub const DEFAULT_ALPHA: f32 = 0.5;
pub const DEFAULT_BETA: f32 = 0.5;

/// hnsw_rs refuses graphs deeper than this.
const MAX_HNSW_LAYERS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Embedding dimension; vectors of any other length are not indexed.
    pub dim: usize,
    pub weights: WeightConfig,
    pub search: SearchConfig,
    pub hnsw: HnswConfig,
    pub tokenizer: TokenizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            weights: WeightConfig::default(),
            search: SearchConfig::default(),
            hnsw: HnswConfig::default(),
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BuildError::Io { path: path.to_path_buf(), source })?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|source| BuildError::Json { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.dim == 0 {
            return Err(BuildError::InvalidConfig("dim must be greater than zero".into()));
        }
        self.search.validate()?;
        self.hnsw.validate()?;
        Ok(())
    }
}

/// Posting weight formula constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub title_boost: u32,
    pub body_weight: u32,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self { title_boost: DEFAULT_TITLE_BOOST, body_weight: DEFAULT_BODY_WEIGHT }
    }
}

impl WeightConfig {
    #[inline]
    pub fn weight(&self, title_count: u32, body_count: u32) -> u32 {
        self.title_boost
            .saturating_mul(title_count)
            .saturating_add(self.body_weight.saturating_mul(body_count))
    }
}

/// How vector similarities enter the fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorNormalization {
    /// Similarities are used as returned by the ANN index.
    #[default]
    Raw,
    /// Similarities are divided by the largest positive similarity, like the lexical side.
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Nearest neighbours fetched from the ANN index.
    pub k: usize,
    /// Lexical weight in the fused score.
    pub alpha: f32,
    /// Vector weight in the fused score.
    pub beta: f32,
    pub vector_normalization: VectorNormalization,
    /// Truncate the ranked list; `None` returns every candidate.
    pub limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            vector_normalization: VectorNormalization::Raw,
            limit: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.k == 0 {
            return Err(BuildError::InvalidConfig("search.k must be greater than zero".into()));
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BuildError::InvalidConfig(format!("search.{name} must be a finite non-negative number, got {value}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_layer: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self { m: 16, ef_construction: 200, ef_search: 100, max_layer: MAX_HNSW_LAYERS }
    }
}

impl HnswConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.m == 0 || self.m > 256 {
            return Err(BuildError::InvalidConfig(format!("hnsw.m must be in 1..=256, got {}", self.m)));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(BuildError::InvalidConfig("hnsw ef parameters must be greater than zero".into()));
        }
        if self.max_layer == 0 || self.max_layer > MAX_HNSW_LAYERS {
            return Err(BuildError::InvalidConfig(format!(
                "hnsw.max_layer must be in 1..={MAX_HNSW_LAYERS}, got {}",
                self.max_layer
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Reduce terms to their English stem.
    pub stem: bool,
    /// Drop English stopwords.
    pub stopwords: bool,
}
