use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, VecgraphError};

/// Graph schema: nodes, typed directed edges, and per-node embedding blobs.
///
/// The composite edge indexes are what keeps neighbor resolution
/// proportional to matching-edge count rather than total edge count.
/// Referential integrity of edge endpoints is the loader's concern, not
/// enforced here: a dangling endpoint must stay readable.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    node_type TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(node_type);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    relation_type TEXT NOT NULL,
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_edges_source_relation ON edges(source_id, relation_type);
CREATE INDEX IF NOT EXISTS idx_edges_target_relation ON edges(target_id, relation_type);

CREATE TABLE IF NOT EXISTS embeddings (
    node_id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL
);
"#;

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a new database connection with optimized pragmas
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(VecgraphError::Storage)?;
        set_pragmas(&conn)?;
        Ok(conn)
    }

    /// Create the graph tables and indexes if they don't exist.
    ///
    /// Idempotent; the ingestion collaborator and the test fixtures both
    /// call this before writing.
    pub async fn init_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)
                .map_err(VecgraphError::Storage)?;
            set_pragmas(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|_e| {
            VecgraphError::Storage(rusqlite::Error::InvalidParameterCount(0, 0))
        })?
    }
}

/// SQLite pragmas for read-heavy workloads.
///
/// WAL mode for concurrent readers, NORMAL sync for speed,
/// temp_store = MEMORY for faster temp operations,
/// cache_size = -65536 (64MB cache) for better read performance,
/// mmap_size = 268435456 (256MB) for memory-mapped I/O on large databases.
/// foreign_keys stays off: edge endpoints may dangle (see SCHEMA_SQL).
fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA temp_store = MEMORY; \
         PRAGMA cache_size = -65536; \
         PRAGMA mmap_size = 268435456;"
    )?;
    Ok(())
}
