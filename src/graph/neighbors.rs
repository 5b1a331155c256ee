//! Neighbor resolution over the edges table.
//!
//! One resolution answers "which node ids sit across edges of this
//! relation, in this direction, from this node". The composite
//! (endpoint, relation_type) indexes make each resolution proportional to
//! the number of matching edges.

use std::collections::HashSet;

use crate::db::Db;
use crate::error::{Result, VecgraphError};
use crate::graph::{Direction, Edge, Node};

/// Frontier ids per IN-list query; keeps well under SQLite's default
/// bound-parameter limit.
const RESOLVE_CHUNK: usize = 500;

fn check_relation(relation_type: &str) -> Result<()> {
    if relation_type.is_empty() {
        return Err(VecgraphError::InvalidArgument(
            "relation_type must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Column pair for a direction: (endpoint we match on, endpoint we return).
fn direction_columns(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Out => ("source_id", "target_id"),
        Direction::In => ("target_id", "source_id"),
    }
}

/// Resolve the adjacent node ids for one node.
///
/// Unknown ids yield an empty set; absence of relationships is a normal
/// graph condition, not a failure. Duplicate parallel edges collapse to
/// one neighbor id.
pub async fn resolve(
    db: &Db,
    node_id: &str,
    relation_type: &str,
    direction: Direction,
) -> Result<HashSet<String>> {
    check_relation(relation_type)?;

    let (match_col, other_col) = direction_columns(direction);
    let sql = format!(
        "SELECT DISTINCT {} FROM edges WHERE {} = ?1 AND relation_type = ?2",
        other_col, match_col
    );
    let node_id = node_id.to_string();
    let relation = relation_type.to_string();

    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(rusqlite::params![node_id, relation], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
            .map_err(VecgraphError::Storage)?;
        Ok(ids)
    })
    .await
}

/// Resolve a whole frontier in one pass.
///
/// Semantically the union of per-node [`resolve`] calls: every neighbor id
/// appears once no matter how many frontier nodes reach it. The frontier
/// is queried in sorted chunks so the issued SQL is deterministic.
pub async fn resolve_frontier(
    db: &Db,
    frontier: &HashSet<String>,
    relation_type: &str,
    direction: Direction,
) -> Result<HashSet<String>> {
    check_relation(relation_type)?;

    if frontier.is_empty() {
        return Ok(HashSet::new());
    }

    let (match_col, other_col) = direction_columns(direction);
    let mut sorted: Vec<String> = frontier.iter().cloned().collect();
    sorted.sort();

    let mut neighbors = HashSet::new();
    for chunk in sorted.chunks(RESOLVE_CHUNK) {
        let chunk: Vec<String> = chunk.to_vec();
        let relation = relation_type.to_string();
        let sql = format!(
            "SELECT DISTINCT {} FROM edges WHERE relation_type = ? AND {} IN ({})",
            other_col,
            match_col,
            chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",")
        );
        let batch = db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let mut params: Vec<Box<dyn rusqlite::ToSql>> =
                    vec![Box::new(relation)];
                for id in &chunk {
                    params.push(Box::new(id.clone()));
                }
                let ids = stmt
                    .query_map(rusqlite::params_from_iter(params), |row| {
                        row.get::<_, String>(0)
                    })?
                    .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
                    .map_err(VecgraphError::Storage)?;
                Ok(ids)
            })
            .await?;
        neighbors.extend(batch);
    }

    Ok(neighbors)
}

/// A resolved neighbor: the node reached and the edge that reached it.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub edge: Edge,
    pub node: Node,
    pub direction: Direction,
}

/// Record-returning variant of [`resolve`] for display-oriented callers.
///
/// Joins through to the nodes table, so a dangling edge endpoint yields no
/// entry here even though [`resolve`] would still report its id.
pub async fn neighbors(
    db: &Db,
    node_id: &str,
    relation_type: &str,
    direction: Direction,
) -> Result<Vec<Neighbor>> {
    check_relation(relation_type)?;

    let (match_col, other_col) = direction_columns(direction);
    let sql = format!(
        "SELECT e.id, e.source_id, e.target_id, e.relation_type, e.metadata, \
                n.id, n.name, n.node_type \
         FROM edges e JOIN nodes n ON n.id = e.{} \
         WHERE e.{} = ?1 AND e.relation_type = ?2 \
         ORDER BY n.id",
        other_col, match_col
    );
    let node_id = node_id.to_string();
    let relation = relation_type.to_string();

    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params![node_id, relation], |row| {
                Ok(Neighbor {
                    edge: Edge {
                        id: row.get(0)?,
                        source_id: row.get(1)?,
                        target_id: row.get(2)?,
                        relation_type: row.get(3)?,
                        metadata: row.get(4)?,
                    },
                    node: Node {
                        id: row.get(5)?,
                        name: row.get(6)?,
                        node_type: row.get(7)?,
                    },
                    direction,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(VecgraphError::Storage)?;
        Ok(rows)
    })
    .await
}
