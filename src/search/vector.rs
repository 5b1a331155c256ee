use crate::db::Db;
use crate::embeddings::decode_embedding;
use crate::error::{Result, VecgraphError};
use crate::search::SeedHit;

/// K-nearest-neighbor search over node embeddings by cosine distance.
///
/// Scans `embeddings JOIN nodes`, scores in Rust, and returns the `k`
/// closest hits sorted ascending by distance; equal distances are broken
/// by node id ascending so repeated queries rank identically. Rows whose
/// stored blob does not match the query dimension are skipped with a
/// data-quality warning.
///
/// `node_type` optionally restricts candidates to one category label.
pub async fn knn(
    db: &Db,
    query_vec: &[f32],
    k: usize,
    node_type: Option<&str>,
) -> Result<Vec<SeedHit>> {
    if k == 0 {
        return Err(VecgraphError::InvalidArgument(
            "k must be greater than 0".to_string(),
        ));
    }
    if query_vec.is_empty() {
        return Err(VecgraphError::InvalidArgument(
            "query vector must not be empty".to_string(),
        ));
    }

    let type_filter = node_type.map(String::from);
    let rows = db
        .with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.name, n.node_type, e.embedding \
                 FROM embeddings e JOIN nodes n ON n.id = e.node_id \
                 WHERE (?1 IS NULL OR n.node_type = ?1)",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![type_filter], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                .map_err(VecgraphError::Storage)?;
            Ok(rows)
        })
        .await?;

    let mut hits: Vec<SeedHit> = Vec::new();
    for (node_id, name, node_type, blob) in rows {
        let embedding = match decode_embedding(&blob) {
            Some(e) => e,
            None => {
                log::warn!("undecodable embedding blob for node {node_id}");
                continue;
            }
        };
        if embedding.len() != query_vec.len() {
            log::warn!(
                "dimension mismatch for node {node_id}: stored {}, query {}",
                embedding.len(),
                query_vec.len()
            );
            continue;
        }
        let similarity = cosine_similarity(query_vec, &embedding);
        hits.push(SeedHit {
            node_id,
            name,
            node_type,
            distance: 1.0 - similarity,
            similarity,
        });
    }

    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    hits.truncate(k);
    Ok(hits)
}

/// Compute cosine similarity between two vectors of equal length.
///
/// 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must have same length for cosine similarity"
    );

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::store_embedding;
    use crate::graph::test_fixtures::citation_graph;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_magnitude() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_magnitude_independent() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![2.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_knn_ranks_by_ascending_distance() {
        let (db, _temp) = citation_graph().await;
        store_embedding(&db, "P1", &[1.0, 0.0]).await.unwrap();
        store_embedding(&db, "A1", &[0.8, 0.6]).await.unwrap();
        store_embedding(&db, "A2", &[0.0, 1.0]).await.unwrap();

        let hits = knn(&db, &[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "A1", "A2"]);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[tokio::test]
    async fn test_knn_ties_break_by_node_id() {
        let (db, _temp) = citation_graph().await;
        // A1 and A2 sit at the same angle to the query.
        store_embedding(&db, "A2", &[1.0, 0.0]).await.unwrap();
        store_embedding(&db, "A1", &[2.0, 0.0]).await.unwrap();

        let hits = knn(&db, &[1.0, 0.0], 2, None).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
    }

    #[tokio::test]
    async fn test_knn_truncates_to_k() {
        let (db, _temp) = citation_graph().await;
        store_embedding(&db, "P1", &[1.0, 0.0]).await.unwrap();
        store_embedding(&db, "A1", &[0.9, 0.1]).await.unwrap();
        store_embedding(&db, "A2", &[0.0, 1.0]).await.unwrap();

        let hits = knn(&db, &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "P1");
    }

    #[tokio::test]
    async fn test_knn_node_type_filter() {
        let (db, _temp) = citation_graph().await;
        store_embedding(&db, "P1", &[0.0, 1.0]).await.unwrap();
        store_embedding(&db, "A1", &[1.0, 0.0]).await.unwrap();

        // Without the filter A1 would win; restricted to papers it cannot.
        let hits = knn(&db, &[1.0, 0.0], 5, Some("paper")).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["P1"]);
    }

    #[tokio::test]
    async fn test_knn_skips_dimension_mismatch() {
        let (db, _temp) = citation_graph().await;
        store_embedding(&db, "P1", &[1.0, 0.0]).await.unwrap();
        store_embedding(&db, "A1", &[1.0, 0.0, 0.0]).await.unwrap();

        let hits = knn(&db, &[1.0, 0.0], 5, None).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["P1"]);
    }

    #[tokio::test]
    async fn test_knn_rejects_zero_k() {
        let (db, _temp) = citation_graph().await;
        let err = knn(&db, &[1.0, 0.0], 0, None).await.unwrap_err();
        assert!(matches!(err, VecgraphError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_knn_no_embeddings_is_empty_result() {
        let (db, _temp) = citation_graph().await;
        let hits = knn(&db, &[1.0, 0.0], 5, None).await.unwrap();
        assert!(hits.is_empty());
    }
}
