//! budgetchat - Retrieval-augmented question answering over provincial
//! budget documents
//!
//! # Architecture
//!
//! Online path: classify -> retrieve (semantic + structured tables) ->
//! rerank -> assemble a token-budgeted, citation-annotated context for the
//! external generation capability.
//!
//! Offline path: chunk extracted document pages -> embed in paced batches
//! -> upsert into the vector index. Shares the chunker and embedding client
//! with the online path but runs independently.

pub mod errors;
pub mod types;
pub mod config;

// Offline processing
pub mod chunker;
pub mod indexer;

// External capabilities (dependency-injected, fakeable in tests)
pub mod embedding;
pub mod index;

// Online retrieval pipeline
pub mod classifier;
pub mod tables;
pub mod retriever;
pub mod reranker;
pub mod context;
pub mod prompts;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use pipeline::{RagPipeline, RagResult};
pub use types::{Chunk, ChunkMetadata, ContentType, QueryType};
