//! Core data model for the retrieval pipeline
//!
//! Chunks are the unit of retrievable evidence. Every chunk that reaches the
//! context assembler must carry a non-empty document name and a page number
//! of at least 1, so citations can always be rendered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of content a chunk holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Narrative,
    Table,
    Summary,
}

/// Provenance metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_name: String,
    pub page_number: u32,
    pub section_title: String,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub fiscal_year: String,
}

/// A unit of retrievable evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Relevance score; absent until the retriever or reranker computes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Query intent category, first match wins in the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    Factual,
    Comparison,
    Explanation,
    Exploratory,
    OutOfScope,
}

/// One page of extracted document text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub page_number: u32,
    pub text: String,
}

/// Document-level info supplied to the chunker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocInfo {
    pub document_name: String,
    pub content_type: ContentType,
    pub fiscal_year: String,
}

/// Chunk as persisted by the offline processing flow, optionally with its
/// embedding attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Curated tabular fact set, immutable at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredTable {
    pub id: String,
    pub title: String,
    pub document_name: String,
    pub page_number: u32,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub fiscal_year: String,
    /// Column names in render order
    pub columns: Vec<String>,
    /// Row cells keyed by column name; missing cells render empty
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Substring-matched against the lowercased query
    pub keywords: Vec<String>,
}

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
