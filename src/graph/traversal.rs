//! Frontier-based multi-hop traversal.
//!
//! Starting from a seed set of node ids, applies an ordered path of
//! (relation, direction) steps. Each hop resolves the whole current
//! frontier through the edges index and records the before/after sets, so
//! the caller sees the full hop-by-hop trace including the point where a
//! path exhausts. Nodes reached at an earlier hop may legitimately
//! reappear at a later one (co-authorship style queries depend on it);
//! only within-hop duplicates collapse.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::db::Db;
use crate::error::{Result, VecgraphError};
use crate::graph::{get_nodes, resolve_frontier, Node, PathStep};

/// Per-call traversal knobs.
#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Per-hop frontier-size cap. Exceeding it fails the whole call with
    /// `FrontierTooLarge`; nothing is silently truncated. `None` = uncapped.
    pub max_frontier: Option<usize>,
    /// Caller-driven cancellation. Observed between storage operations;
    /// a cancelled call returns `Cancelled` instead of finishing its hops.
    pub cancel: Option<CancellationToken>,
}

/// The outcome of one hop: the step applied, the frontier it started
/// from, the deduplicated frontier it produced, and the full node records
/// for that new frontier (sorted by id).
#[derive(Debug, Clone)]
pub struct HopResult {
    pub step: PathStep,
    pub frontier_before: HashSet<String>,
    pub frontier_after: HashSet<String>,
    pub nodes: Vec<Node>,
}

fn check_cancelled(options: &TraverseOptions) -> Result<()> {
    if let Some(token) = &options.cancel {
        if token.is_cancelled() {
            return Err(VecgraphError::Cancelled);
        }
    }
    Ok(())
}

/// Reject malformed paths before any storage or embedding work.
pub(crate) fn validate_path(path: &[PathStep]) -> Result<()> {
    for step in path {
        if step.relation_type.is_empty() {
            return Err(VecgraphError::InvalidArgument(
                "path step relation_type must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Walk `path` from `seed_frontier`, returning one [`HopResult`] per step.
///
/// All-or-nothing: a failure at any hop aborts the call and returns no
/// partial hop sequence. An empty seed or an unmatched relation is not a
/// failure; those hops simply carry empty frontiers.
pub async fn traverse(
    db: &Db,
    seed_frontier: &HashSet<String>,
    path: &[PathStep],
    options: &TraverseOptions,
) -> Result<Vec<HopResult>> {
    validate_path(path)?;

    let start = std::time::Instant::now();
    let mut hops = Vec::with_capacity(path.len());
    let mut frontier = seed_frontier.clone();

    for (i, step) in path.iter().enumerate() {
        check_cancelled(options)?;

        let frontier_after =
            resolve_frontier(db, &frontier, &step.relation_type, step.direction).await?;

        if let Some(limit) = options.max_frontier {
            if frontier_after.len() > limit {
                return Err(VecgraphError::FrontierTooLarge {
                    hop: i + 1,
                    size: frontier_after.len(),
                    limit,
                });
            }
        }

        check_cancelled(options)?;

        let nodes = get_nodes(db, &frontier_after).await?;
        if nodes.len() < frontier_after.len() {
            log::warn!(
                "hop {}: {} of {} reached ids have no node record (dangling edges)",
                i + 1,
                frontier_after.len() - nodes.len(),
                frontier_after.len()
            );
        }

        log::debug!(
            "hop {} ({} {:?}): {} -> {} nodes",
            i + 1,
            step.relation_type,
            step.direction,
            frontier.len(),
            frontier_after.len()
        );

        hops.push(HopResult {
            step: step.clone(),
            frontier_before: frontier,
            frontier_after: frontier_after.clone(),
            nodes,
        });
        frontier = frontier_after;
    }

    log::debug!(
        "traversal of {} hops finished in {:?}",
        path.len(),
        start.elapsed()
    );
    Ok(hops)
}
