//! Similarity search over stored node embeddings.

pub mod vector;

pub use vector::{cosine_similarity, knn};

use serde::Serialize;

/// One ranked similarity-search hit, closest first.
#[derive(Debug, Clone, Serialize)]
pub struct SeedHit {
    pub node_id: String,
    pub name: String,
    pub node_type: String,
    /// Cosine distance (1 - similarity); the ranking key, ascending.
    pub distance: f32,
    pub similarity: f32,
}
