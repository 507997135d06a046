//! Approximate nearest-neighbour index over fixed-dimension embeddings.
//!
//! Wraps `hnsw_rs` in inner-product space. Vectors are L2-normalized on the way
//! in (and queries likewise) so `1 - distance` is the cosine similarity.

use crate::config::HnswConfig;
use crate::error::VectorError;
use crate::index::{DocId, VectorMatch};
use hnsw_rs::prelude::{DistDot, Hnsw};

/// DistDot rejects negative distances; scaling unit vectors down a hair keeps
/// `1 - dot` non-negative under rounding.
const DIST_DOT_SHRINK: f32 = 0.999_999;

/// Single owner of the HNSW graph. Read-only queries take `&self` and are safe
/// to run concurrently.
pub struct AnnIndex {
    hnsw: Hnsw<'static, f32, DistDot>,
    /// HNSW point id -> document id.
    doc_ids: Vec<DocId>,
    dimension: usize,
    config: HnswConfig,
}

impl std::fmt::Debug for AnnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnIndex")
            .field("points", &self.doc_ids.len())
            .field("dimension", &self.dimension)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnnIndex {
    /// Create an empty index sized for `capacity` vectors.
    pub fn new(dimension: usize, capacity: usize, config: HnswConfig) -> Result<Self, VectorError> {
        if dimension == 0 {
            return Err(VectorError::InvalidConfig { field: "dimension", reason: "must be greater than zero".into() });
        }
        if config.m == 0 {
            return Err(VectorError::InvalidConfig { field: "m", reason: "must be greater than zero".into() });
        }
        if config.max_layer == 0 || config.max_layer > 16 {
            return Err(VectorError::InvalidConfig { field: "max_layer", reason: format!("{} not in 1..=16", config.max_layer) });
        }
        let hnsw = Hnsw::new(config.m, capacity.max(1), config.max_layer, config.ef_construction.max(1), DistDot);
        Ok(Self { hnsw, doc_ids: Vec::with_capacity(capacity), dimension, config })
    }

    /// Insert one vector. Fails on a wrong dimension or a non-finite component;
    /// the index is left unchanged in that case.
    pub fn insert(&mut self, doc_id: DocId, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch { expected: self.dimension, actual: vector.len() });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFiniteComponent { doc_id });
        }
        let normalized = normalize_for_dist_dot(vector);
        let point_id = self.doc_ids.len();
        self.hnsw.insert((&normalized, point_id));
        self.doc_ids.push(doc_id);
        Ok(())
    }

    /// The `k` nearest neighbours of `query`, best first, ties by ascending doc_id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorError> {
        if query.len() != self.dimension {
            return Err(VectorError::DimensionMismatch { expected: self.dimension, actual: query.len() });
        }
        if k == 0 || self.doc_ids.is_empty() || query.iter().any(|v| !v.is_finite()) {
            return Ok(Vec::new());
        }

        let effective_k = k.min(self.doc_ids.len());
        let ef = self.config.ef_search.max(effective_k);
        let normalized = normalize_for_dist_dot(query);

        let mut matches: Vec<VectorMatch> = self
            .hnsw
            .search(&normalized, effective_k, ef)
            .into_iter()
            .filter_map(|n| {
                self.doc_ids.get(n.d_id).map(|&doc_id| VectorMatch { doc_id, similarity: 1.0 - n.distance })
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then_with(|| a.doc_id.cmp(&b.doc_id)));
        Ok(matches)
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.doc_ids.contains(&doc_id)
    }
}

fn normalize_for_dist_dot(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        let scale = DIST_DOT_SHRINK / norm;
        vector.iter().map(|v| v * scale).collect()
    } else {
        vector.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[(DocId, Vec<f32>)]) -> AnnIndex {
        let dim = vectors[0].1.len();
        let mut ann = AnnIndex::new(dim, vectors.len(), HnswConfig::default()).unwrap();
        for (id, v) in vectors {
            ann.insert(*id, v).unwrap();
        }
        ann
    }

    #[test]
    fn nearest_first() {
        let ann = index_with(&[(1, vec![1.0, 0.0, 0.0]), (2, vec![0.0, 1.0, 0.0]), (3, vec![1.0, 0.1, 0.0])]);
        let hits = ann.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[1].doc_id, 3);
        assert!(hits[0].similarity > 0.99);
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn magnitude_does_not_matter() {
        let ann = index_with(&[(10, vec![3.0, 4.0]), (11, vec![-4.0, 3.0])]);
        let hits = ann.search(&[0.6, 0.8], 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 10);
        assert!((hits[0].similarity - 1.0).abs() < 1e-3);
        assert!(hits[1].similarity.abs() < 1e-3);
    }

    #[test]
    fn opposite_vectors_get_negative_similarity() {
        let ann = index_with(&[(1, vec![1.0, 0.0]), (2, vec![-1.0, 0.0])]);
        let hits = ann.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[1].doc_id, 2);
        assert!(hits[1].similarity < -0.99);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut ann = AnnIndex::new(3, 4, HnswConfig::default()).unwrap();
        assert_eq!(ann.insert(1, &[1.0, 0.0]), Err(VectorError::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(ann.is_empty());
        assert!(matches!(ann.search(&[1.0], 1), Err(VectorError::DimensionMismatch { .. })));
    }

    #[test]
    fn rejects_non_finite() {
        let mut ann = AnnIndex::new(2, 4, HnswConfig::default()).unwrap();
        assert_eq!(ann.insert(5, &[f32::NAN, 1.0]), Err(VectorError::NonFiniteComponent { doc_id: 5 }));
        assert!(!ann.contains(5));
    }

    #[test]
    fn empty_index_returns_nothing() {
        let ann = AnnIndex::new(3, 0, HnswConfig::default()).unwrap();
        assert!(ann.search(&[1.0, 0.0, 0.0], 20).unwrap().is_empty());
    }

    #[test]
    fn k_caps_result_count() {
        let vectors: Vec<(DocId, Vec<f32>)> =
            (0..30u64).map(|i| (i, vec![(i as f32 * 0.1).cos(), (i as f32 * 0.1).sin()])).collect();
        let ann = index_with(&vectors);
        assert_eq!(ann.search(&[1.0, 0.0], 5).unwrap().len(), 5);
        assert_eq!(ann.search(&[1.0, 0.0], 100).unwrap().len(), 30);
    }
}
