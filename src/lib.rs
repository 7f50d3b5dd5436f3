//! # codegraph: Source-Tree Knowledge-Graph Indexer
//!
//! Indexes a source tree into a searchable knowledge graph: discovers files,
//! splits their content into embeddable chunks, parses code into a normalized
//! structural model, and resolves cross-file symbol relationships into a
//! dependency graph handed to external persistence sinks.
//!
//! ## Architecture
//!
//! - **[`config`]**: configuration loading, validation, and defaults
//! - **[`scanner`]**: file discovery, binary sniffing, ignore-pattern filtering
//! - **[`chunker`]**: boundary-advised chunking with fixed-size fallback
//! - **[`extractor`]**: per-language structural extraction (Tree-sitter + regex)
//! - **[`registry`]**: project-wide symbol registry and import path resolution
//! - **[`resolver`]**: cross-file relationship edges (imports, calls, inheritance)
//! - **[`pipeline`]**: orchestration, per-file tally, persistence hand-off
//! - **[`embedder`]**: embedding trait with mock and HTTP implementations
//! - **[`sink`]**: graph and vector persistence sinks (in-memory + SQLite)

pub mod chunker;
pub mod config;
pub mod embedder;
pub mod extractor;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod sink;
