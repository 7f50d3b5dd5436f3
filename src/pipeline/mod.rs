//! The indexing pipeline: scan, chunk, extract, register, resolve, persist.
//!
//! Per-file work (reading, chunking, extraction) runs concurrently; the
//! symbol registry is the barrier between per-file work and cross-file
//! resolution. Per-file failures degrade or skip that file, never the run.
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::chunker::{self, BoundaryAdvisor, Chunk};
use crate::config::Config;
use crate::embedder::Embedder;
use crate::extractor::{self, CodeStructure};
use crate::registry::SymbolRegistry;
use crate::resolver::{self, RelationshipEdge};
use crate::scanner::{FileRecord, FileType, IgnoreRules, Scanner, SkipReason};
use crate::sink::{GraphSink, VectorPoint, VectorSink};

/// Tally of one pipeline run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub discovered: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files indexed without structure because extraction failed.
    pub degraded: usize,
    pub chunks_embedded: usize,
    pub embed_failures: usize,
    pub edges_emitted: usize,
}

/// Per-file result of the concurrent stage.
struct FileOutput {
    record: FileRecord,
    chunks: Vec<Chunk>,
    structure: Option<CodeStructure>,
    degraded: bool,
}

pub struct Pipeline {
    advisor: Arc<dyn BoundaryAdvisor>,
    embedder: Arc<dyn Embedder>,
    graph: Arc<dyn GraphSink>,
    vectors: Arc<dyn VectorSink>,
    config: Config,
}

impl Pipeline {
    pub fn new(
        advisor: Arc<dyn BoundaryAdvisor>,
        embedder: Arc<dyn Embedder>,
        graph: Arc<dyn GraphSink>,
        vectors: Arc<dyn VectorSink>,
        config: Config,
    ) -> Self {
        Self {
            advisor,
            embedder,
            graph,
            vectors,
            config,
        }
    }

    /// Index the tree under `root` end to end.
    pub async fn run(&self, root: &Path) -> Result<IndexReport> {
        let mut report = IndexReport::default();

        let rules = IgnoreRules::load(root);
        let outcome = Scanner::new(root, rules, self.config.max_file_size).scan();
        report.discovered = outcome.files.len() + outcome.skipped.len();
        report.skipped = outcome.skipped.len();

        let outputs = self.process_files(outcome.files, &mut report).await;

        // Registry barrier: cross-file resolution needs every structure.
        let structures: Vec<(String, CodeStructure)> = outputs
            .iter()
            .filter_map(|o| {
                o.structure
                    .as_ref()
                    .map(|s| (o.record.path.clone(), s.clone()))
            })
            .collect();
        let registry = SymbolRegistry::build(structures);
        let edges = resolver::resolve(&registry);
        report.edges_emitted = edges.len();

        self.persist_graph(&outputs, &edges).await?;
        self.embed_chunks(&outputs, &mut report).await?;

        info!(
            "Indexed {} files ({} skipped, {} failed, {} degraded), {} chunks embedded, {} edges",
            report.indexed,
            report.skipped,
            report.failed,
            report.degraded,
            report.chunks_embedded,
            report.edges_emitted
        );
        Ok(report)
    }

    /// Read, chunk and extract every file concurrently. Output order is
    /// restored by path afterwards so persistence stays deterministic.
    async fn process_files(
        &self,
        files: Vec<FileRecord>,
        report: &mut IndexReport,
    ) -> Vec<FileOutput> {
        let mut seen_paths: HashSet<String> = HashSet::new();
        let mut tasks: JoinSet<std::result::Result<FileOutput, (String, SkipReason)>> =
            JoinSet::new();

        for record in files {
            if !seen_paths.insert(record.path.clone()) {
                debug!("Duplicate path in scan output, skipping: {}", record.path);
                continue;
            }
            let advisor = Arc::clone(&self.advisor);
            tasks.spawn(async move { process_one(record, advisor).await });
        }

        let mut outputs = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(output)) => {
                    report.indexed += 1;
                    if output.degraded {
                        report.degraded += 1;
                    }
                    outputs.push(output);
                }
                Ok(Err((path, reason))) => {
                    warn!("Skipping {path}: {}", reason.as_str());
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("File task failed: {e}");
                    report.failed += 1;
                }
            }
        }
        outputs.sort_by(|a, b| a.record.path.cmp(&b.record.path));
        outputs
    }

    /// Create one entity per file, then every resolved edge between them.
    async fn persist_graph(
        &self,
        outputs: &[FileOutput],
        edges: &[RelationshipEdge],
    ) -> Result<()> {
        let mut entity_ids: HashMap<&str, i64> = HashMap::new();
        for output in outputs {
            let record = &output.record;
            let id = self
                .graph
                .create_entity(
                    "File",
                    json!({
                        "path": record.path,
                        "file_type": record.file_type.as_str(),
                        "size_bytes": record.size_bytes,
                        "mtime": record.mtime.to_rfc3339(),
                        "chunk_count": output.chunks.len(),
                        "degraded": output.degraded,
                    }),
                )
                .await
                .with_context(|| format!("failed to persist entity for {}", record.path))?;
            entity_ids.insert(record.path.as_str(), id);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (
                entity_ids.get(edge.source_file.as_str()),
                entity_ids.get(edge.target_file.as_str()),
            ) else {
                debug!(
                    "Edge endpoint not indexed: {} -> {}",
                    edge.source_file, edge.target_file
                );
                continue;
            };
            self.graph
                .create_edge(
                    from,
                    to,
                    edge.kind.as_str(),
                    json!({
                        "source_symbol": edge.source_symbol,
                        "target_symbol": edge.target_symbol,
                        "source_line": edge.source_line,
                        "target_line": edge.target_line,
                        "cross_file": edge.cross_file,
                    }),
                )
                .await
                .context("failed to persist edge")?;
        }
        Ok(())
    }

    /// Embed every chunk and upsert in batches. A chunk whose embedding fails
    /// is dropped from vector storage; the file keeps its graph entity.
    async fn embed_chunks(&self, outputs: &[FileOutput], report: &mut IndexReport) -> Result<()> {
        let mut batch: Vec<VectorPoint> = Vec::new();
        for output in outputs {
            for chunk in &output.chunks {
                let vector = match self.embedder.embed(&chunk.text).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(
                            "Embedding failed for {}:{}: {e}",
                            chunk.source_file, chunk.start_offset
                        );
                        report.embed_failures += 1;
                        continue;
                    }
                };
                batch.push(VectorPoint {
                    id: format!("{}:{}", chunk.source_file, chunk.start_offset),
                    vector,
                    payload: json!({
                        "source_file": chunk.source_file,
                        "start_offset": chunk.start_offset,
                        "end_offset": chunk.end_offset,
                        "text": chunk.text,
                    }),
                });
                report.chunks_embedded += 1;

                if batch.len() >= self.config.vector_batch_size {
                    self.flush(&mut batch).await?;
                }
            }
        }
        self.flush(&mut batch).await?;
        Ok(())
    }

    async fn flush(&self, batch: &mut Vec<VectorPoint>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.vectors
            .upsert(&self.config.collection, std::mem::take(batch))
            .await
            .context("failed to upsert vector batch")?;
        Ok(())
    }
}

/// Read, chunk and (for code) extract one file.
async fn process_one(
    record: FileRecord,
    advisor: Arc<dyn BoundaryAdvisor>,
) -> std::result::Result<FileOutput, (String, SkipReason)> {
    let content = match tokio::fs::read_to_string(&record.absolute_path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("Cannot read {}: {e}", record.path);
            return Err((record.path, SkipReason::Unreadable));
        }
    };

    let chunks = chunker::chunk(&content, record.file_type, &record.path, &*advisor).await;

    let (structure, degraded) = if record.file_type == FileType::Code {
        match extractor::extract_structure(Path::new(&record.path), &content) {
            Ok(structure) => (structure, false),
            Err(e) => {
                warn!("Extraction failed for {}: {e}", record.path);
                (None, true)
            }
        }
    } else {
        (None, false)
    };

    Ok(FileOutput {
        record,
        chunks,
        structure,
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::NoopAdvisor;
    use crate::embedder::mock::MockEmbedder;
    use crate::sink::{MemoryGraphSink, MemoryVectorSink};
    use std::fs;
    use tempfile::tempdir;

    fn pipeline(
        graph: Arc<MemoryGraphSink>,
        vectors: Arc<MemoryVectorSink>,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(NoopAdvisor),
            Arc::new(MockEmbedder::new(8)),
            graph,
            vectors,
            Config::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_small_project() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("utils.js"),
            "export function parse(s) { return s; }\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("app.js"),
            "import { parse } from \"./utils\";\nparse(\"x\");\n",
        )
        .unwrap();

        let graph = Arc::new(MemoryGraphSink::default());
        let vectors = Arc::new(MemoryVectorSink::default());
        let report = pipeline(Arc::clone(&graph), Arc::clone(&vectors))
            .run(temp.path())
            .await
            .unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(graph.entity_count(), 2);
        assert!(!graph.edges_of_type("IMPORTS_RESOLVES_TO").is_empty());
        assert!(!graph.edges_of_type("CALLS_FUNCTION").is_empty());
        assert!(!graph.edges_of_type("DEPENDS_ON").is_empty());
        assert_eq!(vectors.point_count(), report.chunks_embedded);
    }

    #[tokio::test]
    async fn test_broken_file_degrades_but_keeps_chunks() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("broken.js"), "function ((( {{{ nope").unwrap();

        let graph = Arc::new(MemoryGraphSink::default());
        let vectors = Arc::new(MemoryVectorSink::default());
        let report = pipeline(Arc::clone(&graph), Arc::clone(&vectors))
            .run(temp.path())
            .await
            .unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.degraded, 1);
        assert!(report.chunks_embedded > 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_non_code_files_have_no_structure() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("README.md"), "# title\n\nsome prose\n").unwrap();

        let graph = Arc::new(MemoryGraphSink::default());
        let vectors = Arc::new(MemoryVectorSink::default());
        let report = pipeline(Arc::clone(&graph), Arc::clone(&vectors))
            .run(temp.path())
            .await
            .unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.degraded, 0);
        assert_eq!(report.edges_emitted, 0);
        assert!(vectors.point_count() > 0);
    }

    #[tokio::test]
    async fn test_idempotent_rerun() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("a.js"),
            "import { f } from \"./b\";\nf();\n",
        )
        .unwrap();
        fs::write(temp.path().join("b.js"), "export function f() {}\n").unwrap();

        let graph = Arc::new(MemoryGraphSink::default());
        let vectors = Arc::new(MemoryVectorSink::default());
        let p = pipeline(Arc::clone(&graph), Arc::clone(&vectors));

        let first = p.run(temp.path()).await.unwrap();
        let second = p.run(temp.path()).await.unwrap();
        assert_eq!(first.edges_emitted, second.edges_emitted);
        assert_eq!(first.chunks_embedded, second.chunks_embedded);
        // Vector points are upserts keyed by path and offset
        assert_eq!(vectors.point_count(), first.chunks_embedded);
    }
}
