//! Persistence seams for the index output.
//!
//! The pipeline writes through two traits: a graph sink for entities and
//! relationship edges, and a vector sink for embedded chunks. The SQLite
//! store implements both; the memory sinks back tests and dry runs.
pub mod sqlite;

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use sqlite::SqliteStore;

/// Identifier assigned by the graph sink when an entity is created.
pub type EntityId = i64;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One embedded chunk ready for vector storage.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// Destination for entities and relationship edges.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn create_entity(&self, label: &str, properties: Value) -> Result<EntityId, SinkError>;

    async fn create_edge(
        &self,
        from: EntityId,
        to: EntityId,
        edge_type: &str,
        properties: Value,
    ) -> Result<(), SinkError>;
}

/// Destination for embedded chunk vectors.
#[async_trait]
pub trait VectorSink: Send + Sync {
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), SinkError>;
}

/// In-memory graph sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryGraphSink {
    entities: Mutex<Vec<(String, Value)>>,
    edges: Mutex<Vec<(EntityId, EntityId, String, Value)>>,
}

impl MemoryGraphSink {
    pub fn entity_count(&self) -> usize {
        self.entities.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn edges_of_type(&self, edge_type: &str) -> Vec<(EntityId, EntityId, Value)> {
        self.edges
            .lock()
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(_, _, t, _)| t == edge_type)
                    .map(|(f, to, _, p)| (*f, *to, p.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entities(&self) -> Vec<(String, Value)> {
        self.entities.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GraphSink for MemoryGraphSink {
    async fn create_entity(&self, label: &str, properties: Value) -> Result<EntityId, SinkError> {
        let mut entities = self
            .entities
            .lock()
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        entities.push((label.to_string(), properties));
        Ok(entities.len() as EntityId)
    }

    async fn create_edge(
        &self,
        from: EntityId,
        to: EntityId,
        edge_type: &str,
        properties: Value,
    ) -> Result<(), SinkError> {
        self.edges
            .lock()
            .map_err(|e| SinkError::Storage(e.to_string()))?
            .push((from, to, edge_type.to_string(), properties));
        Ok(())
    }
}

/// In-memory vector sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryVectorSink {
    points: Mutex<Vec<(String, VectorPoint)>>,
}

impl MemoryVectorSink {
    pub fn point_count(&self) -> usize {
        self.points.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VectorSink for MemoryVectorSink {
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), SinkError> {
        let mut stored = self
            .points
            .lock()
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        for point in points {
            stored.retain(|(c, p)| !(c == collection && p.id == point.id));
            stored.push((collection.to_string(), point));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_graph_sink() {
        let sink = MemoryGraphSink::default();
        let a = sink.create_entity("File", json!({"path": "a.js"})).await.unwrap();
        let b = sink.create_entity("File", json!({"path": "b.js"})).await.unwrap();
        sink.create_edge(a, b, "DEPENDS_ON", json!({})).await.unwrap();

        assert_eq!(sink.entity_count(), 2);
        assert_eq!(sink.edges_of_type("DEPENDS_ON").len(), 1);
        assert!(sink.edges_of_type("CALLS_FUNCTION").is_empty());
    }

    #[tokio::test]
    async fn test_memory_vector_sink_upsert_replaces() {
        let sink = MemoryVectorSink::default();
        let point = |id: &str| VectorPoint {
            id: id.to_string(),
            vector: vec![0.1, 0.2],
            payload: json!({}),
        };
        sink.upsert("chunks", vec![point("p1"), point("p2")]).await.unwrap();
        sink.upsert("chunks", vec![point("p1")]).await.unwrap();
        assert_eq!(sink.point_count(), 2);
    }
}
