use crate::db::Db;
use crate::error::Result;
use rusqlite::params;

/// Encode a vector as a little-endian f32 BLOB, the on-disk layout of the
/// embeddings table.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 BLOB back to a vector.
///
/// `None` if the byte length is not a whole number of f32s.
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }

    blob.chunks(4)
        .map(|bytes| {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(f32::from_le_bytes(arr))
        })
        .collect()
}

/// Store the embedding for a node, replacing any previous one.
///
/// A node has at most one embedding. The write path belongs to the
/// ingestion collaborator; it lives here so the loader and the tests share
/// one BLOB layout.
pub async fn store_embedding(db: &Db, node_id: &str, embedding: &[f32]) -> Result<()> {
    let bytes = encode_embedding(embedding);
    let node_id = node_id.to_string();

    db.with_connection(move |conn| {
        conn.execute(
            "INSERT OR REPLACE INTO embeddings (node_id, embedding) VALUES (?1, ?2)",
            params![node_id, bytes],
        )?;
        Ok(())
    })
    .await
}

/// Fetch the embedding for a node.
///
/// `None` when the node has no embedding; that is a valid zero-result, not
/// an error. An undecodable blob is reported as missing and logged as a
/// data-quality warning.
pub async fn get_embedding(db: &Db, node_id: &str) -> Result<Option<Vec<f32>>> {
    let id = node_id.to_string();

    let blob = db
        .with_connection(move |conn| {
            let mut stmt =
                conn.prepare("SELECT embedding FROM embeddings WHERE node_id = ?1")?;
            let result = stmt.query_row([&id], |row| row.get::<_, Vec<u8>>(0));
            match result {
                Ok(blob) => Ok(Some((id, blob))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?;

    match blob {
        None => Ok(None),
        Some((id, blob)) => match decode_embedding(&blob) {
            Some(vector) => Ok(Some(vector)),
            None => {
                log::warn!("undecodable embedding blob for node {id} ({} bytes)", blob.len());
                Ok(None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_fixtures::citation_graph;

    #[test]
    fn test_encode_decode_roundtrip() {
        let vector = vec![1.0f32, -0.5, 0.25, 3.75];
        let decoded = decode_embedding(&encode_embedding(&vector)).unwrap();
        assert_eq!(decoded, vector);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        let blob = vec![0u8, 1, 2, 3, 4];
        assert!(decode_embedding(&blob).is_none());
    }

    #[test]
    fn test_decode_empty_blob() {
        assert_eq!(decode_embedding(&[]), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_store_and_get_embedding() {
        let (db, _temp) = citation_graph().await;
        let vector = vec![0.1f32, 0.2, 0.3];
        store_embedding(&db, "P1", &vector).await.unwrap();

        let fetched = get_embedding(&db, "P1").await.unwrap().unwrap();
        assert_eq!(fetched, vector);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_embedding() {
        let (db, _temp) = citation_graph().await;
        store_embedding(&db, "P1", &[1.0, 0.0]).await.unwrap();
        store_embedding(&db, "P1", &[0.0, 1.0]).await.unwrap();

        let fetched = get_embedding(&db, "P1").await.unwrap().unwrap();
        assert_eq!(fetched, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_missing_embedding_is_none() {
        let (db, _temp) = citation_graph().await;
        assert!(get_embedding(&db, "A1").await.unwrap().is_none());
    }
}
