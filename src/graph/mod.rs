//! Knowledge graph module: entity records, neighbor resolution, and
//! frontier-based multi-hop traversal.
//!
//! Nodes and edges are read-only here; writes belong to the ingestion
//! pipeline that loads the store.

mod neighbors;
mod traversal;

pub use neighbors::{neighbors, resolve, resolve_frontier, Neighbor};
pub use traversal::{traverse, HopResult, TraverseOptions};
pub(crate) use traversal::validate_path;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{Result, VecgraphError};

/// An entity vertex: stable id, display name, category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique, stable identifier, e.g. `paper:2304.01234`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category label, e.g. `paper`, `author`.
    pub node_type: String,
}

/// A directed, typed relationship between two node ids
/// (source --relation_type--> target).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier.
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Relation type, e.g. `author_write_paper`. Free-form string,
    /// matched exactly against path steps.
    pub relation_type: String,
    /// Optional JSON metadata, opaque to traversal.
    pub metadata: Option<String>,
}

/// Edge-following direction relative to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges where the current node is the source.
    Out,
    /// Follow edges where the current node is the target.
    In,
}

/// One step of a multi-hop path: which relation to follow, and which way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub relation_type: String,
    pub direction: Direction,
}

impl PathStep {
    pub fn new(relation_type: impl Into<String>, direction: Direction) -> Self {
        Self {
            relation_type: relation_type.into(),
            direction,
        }
    }
}

/// Store-wide counts, broken down by node type and relation type.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_embeddings: usize,
    pub nodes_by_type: HashMap<String, usize>,
    pub edges_by_relation: HashMap<String, usize>,
}

/// Fetch a node by id. `None` if absent.
pub async fn get_node(db: &Db, node_id: &str) -> Result<Option<Node>> {
    let id = node_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt =
            conn.prepare("SELECT id, name, node_type FROM nodes WHERE id = ?1")?;
        let result = stmt.query_row([&id], |row| {
            Ok(Node {
                id: row.get(0)?,
                name: row.get(1)?,
                node_type: row.get(2)?,
            })
        });
        match result {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(VecgraphError::Storage(e)),
        }
    })
    .await
}

/// Fetch a node by id, failing with `NotFound` if absent.
pub async fn require_node(db: &Db, node_id: &str) -> Result<Node> {
    get_node(db, node_id)
        .await?
        .ok_or_else(|| VecgraphError::NotFound(node_id.to_string()))
}

/// Fetch full records for a set of node ids, sorted by id.
///
/// Ids with no backing row are silently absent from the result; callers
/// that care (the traversal engine does) compare counts and warn.
pub async fn get_nodes(db: &Db, ids: &HashSet<String>) -> Result<Vec<Node>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    // Chunked IN-lists keep us under SQLite's bound-parameter limit.
    let mut sorted: Vec<String> = ids.iter().cloned().collect();
    sorted.sort();

    let mut nodes = Vec::with_capacity(sorted.len());
    for chunk in sorted.chunks(500) {
        let chunk: Vec<String> = chunk.to_vec();
        let mut batch = db
            .with_connection(move |conn| {
                let placeholders =
                    chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!(
                    "SELECT id, name, node_type FROM nodes WHERE id IN ({})",
                    placeholders
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                        Ok(Node {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            node_type: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(VecgraphError::Storage)?;
                Ok(rows)
            })
            .await?;
        nodes.append(&mut batch);
    }

    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(nodes)
}

/// Store-wide statistics: totals plus per-type and per-relation counts.
pub async fn stats(db: &Db) -> Result<GraphStats> {
    db.with_connection(|conn| {
        let total_nodes: usize =
            conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let total_edges: usize =
            conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        let total_embeddings: usize =
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;

        let mut stmt =
            conn.prepare("SELECT node_type, COUNT(*) FROM nodes GROUP BY node_type")?;
        let nodes_by_type = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, rusqlite::Error>>()
            .map_err(VecgraphError::Storage)?;

        let mut stmt = conn
            .prepare("SELECT relation_type, COUNT(*) FROM edges GROUP BY relation_type")?;
        let edges_by_relation = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, rusqlite::Error>>()
            .map_err(VecgraphError::Storage)?;

        Ok(GraphStats {
            total_nodes,
            total_edges,
            total_embeddings,
            nodes_by_type,
            edges_by_relation,
        })
    })
    .await
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    /// Fresh store with the paper/author/affiliation graph used across the
    /// traversal tests:
    ///
    /// ```text
    /// A1 --author_write_paper--> P1 <--author_write_paper-- A2
    /// A1 --author_in_affiliation--> F1 <--author_in_affiliation-- A2
    /// ```
    pub async fn citation_graph() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));
        db.init_schema().await.unwrap();

        db.with_connection(|conn| {
            let nodes = [
                ("P1", "Attention Is All You Need", "paper"),
                ("A1", "Ada Lovelace", "author"),
                ("A2", "Alan Turing", "author"),
                ("F1", "Analytical Engines Lab", "affiliation"),
            ];
            for (id, name, node_type) in nodes {
                conn.execute(
                    "INSERT INTO nodes (id, name, node_type) VALUES (?1, ?2, ?3)",
                    params![id, name, node_type],
                )?;
            }
            let edges = [
                ("e1", "A1", "P1", "author_write_paper"),
                ("e2", "A2", "P1", "author_write_paper"),
                ("e3", "A1", "F1", "author_in_affiliation"),
                ("e4", "A2", "F1", "author_in_affiliation"),
            ];
            for (id, source, target, relation) in edges {
                conn.execute(
                    "INSERT INTO edges (id, source_id, target_id, relation_type, metadata) \
                     VALUES (?1, ?2, ?3, ?4, NULL)",
                    params![id, source, target, relation],
                )?;
            }
            Ok(())
        })
        .await
        .unwrap();

        (db, temp_dir)
    }

    pub fn id_set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }
}
