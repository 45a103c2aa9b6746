//! Offline indexing flow: chunk → embed → upsert
//!
//! Populates the vector index from processed documents. Embedding runs in
//! sequential batches with a fixed pause between them, trading throughput
//! for predictable load on the embedding service. Within a batch, vectors
//! are mapped back to chunks positionally; the embedding client guarantees
//! that order, and a mismatch surfaces as an error rather than silently
//! mis-attributed vectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::chunker::chunk_document;
use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::{cap_content_metadata, VectorRecord, VectorStore};
use crate::types::{Chunk, DocInfo, PageContent, ProcessedChunk};

/// Combined chunk file written next to the per-document files
pub const ALL_CHUNKS_FILE: &str = "_all_chunks.json";
/// Manifest summarizing one processing run
pub const MANIFEST_FILE: &str = "_manifest.json";

/// One source document in the processing catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// File of extracted pages (JSON array of {page_number, text}) under
    /// the pages directory
    pub pages_file: String,
    #[serde(flatten)]
    pub doc_info: DocInfo,
}

/// Summary of a processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingManifest {
    pub document_count: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Records per upsert call
    pub upsert_batch_size: usize,
    /// Pause between consecutive upsert batches (milliseconds); zero in
    /// tests
    pub batch_delay_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: 100,
            batch_delay_ms: 500,
        }
    }
}

/// Outcome of processing one document
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub document_name: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

/// Process catalog documents into chunk files.
///
/// Reads extracted pages for each catalog entry, chunks them, and writes one
/// chunk file per document plus the combined file and a manifest. Documents
/// whose pages file is missing are skipped with a warning; a document that
/// produces zero chunks is reported as an anomaly, not a failure.
pub fn process_documents(
    catalog: &[DocumentSpec],
    pages_dir: &Path,
    chunks_dir: &Path,
) -> Result<Vec<ProcessedDocument>> {
    fs::create_dir_all(chunks_dir)?;

    let mut outcomes = Vec::new();
    let mut all_chunks: Vec<ProcessedChunk> = Vec::new();

    for spec in catalog {
        let pages_path = pages_dir.join(&spec.pages_file);
        if !pages_path.exists() {
            warn!(file = %pages_path.display(), "pages file not found, skipping");
            continue;
        }

        let pages: Vec<PageContent> = serde_json::from_str(&fs::read_to_string(&pages_path)?)?;
        let chunks = chunk_document(&pages, &spec.doc_info);

        if chunks.is_empty() {
            warn!(
                document = %spec.doc_info.document_name,
                "document produced zero chunks"
            );
        }

        let processed: Vec<ProcessedChunk> = chunks.into_iter().map(processed_chunk).collect();

        let out_path = chunks_dir.join(chunk_file_name(&spec.pages_file));
        fs::write(&out_path, serde_json::to_string_pretty(&processed)?)?;

        info!(
            document = %spec.doc_info.document_name,
            pages = pages.len(),
            chunks = processed.len(),
            "processed document"
        );

        outcomes.push(ProcessedDocument {
            document_name: spec.doc_info.document_name.clone(),
            page_count: pages.len(),
            chunk_count: processed.len(),
        });
        all_chunks.extend(processed);
    }

    fs::write(
        chunks_dir.join(ALL_CHUNKS_FILE),
        serde_json::to_string_pretty(&all_chunks)?,
    )?;

    let manifest = ProcessingManifest {
        document_count: outcomes.len(),
        chunk_count: all_chunks.len(),
        created_at: Utc::now(),
    };
    fs::write(
        chunks_dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(outcomes)
}

fn processed_chunk(chunk: Chunk) -> ProcessedChunk {
    ProcessedChunk {
        id: chunk.id,
        content: chunk.content,
        metadata: chunk.metadata,
        embedding: None,
    }
}

fn chunk_file_name(pages_file: &str) -> PathBuf {
    let stem = Path::new(pages_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(pages_file);
    PathBuf::from(format!("{stem}.chunks.json"))
}

/// Offline indexer pushing processed chunks into the vector index
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: IndexingConfig,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_config(embedder, store, IndexingConfig::default())
    }

    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Load the combined chunk file written by `process_documents`.
    pub fn load_chunks(chunks_dir: &Path) -> Result<Vec<ProcessedChunk>> {
        let path = chunks_dir.join(ALL_CHUNKS_FILE);
        let chunks = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(chunks)
    }

    /// Embed chunks and upsert them, returning the number of records
    /// written. Batches are sequential; the embedder handles its own
    /// request batching and pacing internally.
    pub async fn index_chunks(&self, chunks: &[ProcessedChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let batch_size = self.config.upsert_batch_size.max(1);
        let batch_count = chunks.len().div_ceil(batch_size);
        let mut upserted = 0;

        for (batch_idx, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;

            // Positional mapping back to the originating chunks
            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, vector)| VectorRecord {
                    id: chunk.id.clone(),
                    vector,
                    metadata: chunk_payload(chunk),
                })
                .collect();

            upserted += records.len();
            self.store.upsert(records).await?;

            info!(
                batch = batch_idx + 1,
                of = batch_count,
                upserted,
                total = chunks.len(),
                "upserted batch"
            );

            if batch_idx + 1 < batch_count && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        Ok(upserted)
    }
}

/// Flatten chunk metadata into plain scalars, capping stored content to the
/// index-side limit.
fn chunk_payload(chunk: &ProcessedChunk) -> HashMap<String, serde_json::Value> {
    let meta = &chunk.metadata;
    let mut payload = HashMap::new();

    payload.insert("content".to_string(), json!(cap_content_metadata(&chunk.content)));
    payload.insert("document_name".to_string(), json!(meta.document_name));
    payload.insert("page_number".to_string(), json!(meta.page_number));
    payload.insert("section_title".to_string(), json!(meta.section_title));
    payload.insert("content_type".to_string(), json!(meta.content_type));
    payload.insert("fiscal_year".to_string(), json!(meta.fiscal_year));
    if let Some(department) = &meta.department {
        payload.insert("department".to_string(), json!(department));
    }

    payload
}
