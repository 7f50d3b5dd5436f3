//! SQLite-backed store implementing both persistence seams.
use std::path::Path;

use async_trait::async_trait;
use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::info;

use super::{EntityId, GraphSink, SinkError, VectorPoint, VectorSink};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    properties TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_entity_label ON entities(label);

CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL,
    target_id INTEGER NOT NULL,
    edge_type TEXT NOT NULL,
    properties TEXT NOT NULL,
    FOREIGN KEY (source_id) REFERENCES entities(id) ON DELETE CASCADE,
    FOREIGN KEY (target_id) REFERENCES entities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_edge_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edge_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edge_type ON edges(edge_type);

CREATE TABLE IF NOT EXISTS points (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    point_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    payload TEXT NOT NULL,
    UNIQUE(collection, point_id)
);

CREATE INDEX IF NOT EXISTS idx_point_collection ON points(collection);
"#;

impl From<rusqlite::Error> for SinkError {
    fn from(e: rusqlite::Error) -> Self {
        SinkError::Storage(e.to_string())
    }
}

/// A wrapper around a SQLite connection initialized with the index schema.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database connection at the given path and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref();
        info!("Initializing database: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database connection (useful for testing).
    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn entity_count(&self) -> Result<usize, SinkError> {
        let conn = self.conn.lock().await;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn edge_count(&self) -> Result<usize, SinkError> {
        let conn = self.conn.lock().await;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn point_count(&self, collection: &str) -> Result<usize, SinkError> {
        let conn = self.conn.lock().await;
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM points WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Serialize a float32 vector into little-endian bytes for BLOB storage.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

#[async_trait]
impl GraphSink for SqliteStore {
    async fn create_entity(
        &self,
        label: &str,
        properties: serde_json::Value,
    ) -> Result<EntityId, SinkError> {
        let properties = serde_json::to_string(&properties)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO entities (label, properties) VALUES (?1, ?2)",
            params![label, properties],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn create_edge(
        &self,
        from: EntityId,
        to: EntityId,
        edge_type: &str,
        properties: serde_json::Value,
    ) -> Result<(), SinkError> {
        let properties = serde_json::to_string(&properties)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO edges (source_id, target_id, edge_type, properties) VALUES (?1, ?2, ?3, ?4)",
            params![from, to, edge_type, properties],
        )?;
        Ok(())
    }
}

#[async_trait]
impl VectorSink for SqliteStore {
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), SinkError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for point in &points {
            let payload = serde_json::to_string(&point.payload)
                .map_err(|e| SinkError::Serialization(e.to_string()))?;
            tx.execute(
                "INSERT INTO points (collection, point_id, embedding, payload)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, point_id)
                 DO UPDATE SET embedding = excluded.embedding, payload = excluded.payload",
                params![
                    collection,
                    point.id,
                    serialize_vector(&point.vector),
                    payload
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
