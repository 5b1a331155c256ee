//! Query facade: similarity search composed with graph traversal.
//!
//! `GraphQuery` captures the store handle (and optionally an embedding
//! client) at construction, so every read path flows through one
//! explicitly-owned connection manager instead of a process-global handle.

use std::collections::HashSet;

use crate::db::Db;
use crate::embeddings::OpenAIEmbedder;
use crate::error::{Result, VecgraphError};
use crate::graph::{self, traverse, HopResult, PathStep, TraverseOptions};
use crate::search::{vector::knn, SeedHit};

/// A similarity query: raw text (embedded via the external service) or an
/// already-computed vector.
#[derive(Debug, Clone)]
pub enum Query {
    Text(String),
    Embedding(Vec<f32>),
}

/// Ranked seeds plus the full hop-by-hop traversal trace.
#[derive(Debug, Clone)]
pub struct SearchTraversal {
    /// Similarity hits, ascending distance; kept ranked for display.
    pub seeds: Vec<SeedHit>,
    /// One entry per path step.
    pub hops: Vec<HopResult>,
}

/// Combined graph + vector query interface over one store.
pub struct GraphQuery {
    db: Db,
    embedder: Option<OpenAIEmbedder>,
    dimensions: usize,
    traverse_options: TraverseOptions,
}

impl GraphQuery {
    /// Create a facade over `db` for embeddings of dimension `dimensions`.
    ///
    /// Text queries need [`with_embedder`](Self::with_embedder); without it
    /// they fail with `EmbeddingUnavailable`.
    pub fn new(db: Db, dimensions: usize) -> Self {
        Self {
            db,
            embedder: None,
            dimensions,
            traverse_options: TraverseOptions::default(),
        }
    }

    /// Attach an embedding client for text queries.
    pub fn with_embedder(mut self, embedder: OpenAIEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Override the default traversal options (frontier cap, cancellation).
    pub fn with_traverse_options(mut self, options: TraverseOptions) -> Self {
        self.traverse_options = options;
        self
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Resolve a query to a vector. The embedding call is the only
    /// suspension point that leaves the process; no storage locks are held
    /// across it.
    async fn query_vector(&self, query: Query) -> Result<Vec<f32>> {
        let vector = match query {
            Query::Embedding(v) => v,
            Query::Text(text) => match &self.embedder {
                Some(embedder) => embedder.embed(&text).await?,
                None => {
                    return Err(VecgraphError::EmbeddingUnavailable(
                        "no embedding client configured".to_string(),
                    ))
                }
            },
        };

        if vector.len() != self.dimensions {
            return Err(VecgraphError::InvalidArgument(format!(
                "query vector dimension {} does not match store dimension {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(vector)
    }

    /// K-nearest nodes for a query, ascending distance, ties by node id.
    pub async fn search(&self, query: Query, k: usize) -> Result<Vec<SeedHit>> {
        self.search_filtered(query, k, None).await
    }

    /// [`search`](Self::search) restricted to one node type.
    pub async fn search_filtered(
        &self,
        query: Query,
        k: usize,
        node_type: Option<&str>,
    ) -> Result<Vec<SeedHit>> {
        if k == 0 {
            return Err(VecgraphError::InvalidArgument(
                "k must be greater than 0".to_string(),
            ));
        }
        let vector = self.query_vector(query).await?;
        knn(&self.db, &vector, k, node_type).await
    }

    /// Multi-hop traversal from explicit seed ids.
    pub async fn traverse(
        &self,
        seed_ids: &HashSet<String>,
        path: &[PathStep],
    ) -> Result<Vec<HopResult>> {
        traverse(&self.db, seed_ids, path, &self.traverse_options).await
    }

    /// Similarity search, then walk `path` from the hit set.
    ///
    /// The seed frontier is the *set* of returned ids; ranking is kept only
    /// in `seeds` for display. Arguments are validated before the
    /// embedding call, so a bad `k` or path never reaches the network.
    pub async fn search_then_traverse(
        &self,
        query: Query,
        k: usize,
        path: &[PathStep],
    ) -> Result<SearchTraversal> {
        if k == 0 {
            return Err(VecgraphError::InvalidArgument(
                "k must be greater than 0".to_string(),
            ));
        }
        graph::validate_path(path)?;

        let vector = self.query_vector(query).await?;
        let seeds = knn(&self.db, &vector, k, None).await?;

        let seed_frontier: HashSet<String> =
            seeds.iter().map(|hit| hit.node_id.clone()).collect();
        let hops = traverse(&self.db, &seed_frontier, path, &self.traverse_options).await?;

        Ok(SearchTraversal { seeds, hops })
    }
}
