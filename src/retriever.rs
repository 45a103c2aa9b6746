//! Hybrid retrieval: semantic vector search plus structured-table lookup
//!
//! Classifies the query, short-circuits out-of-scope queries before any
//! network call, filters semantic matches through a hard similarity floor,
//! and for fact/comparison intents merges curated table chunks ahead of the
//! semantic results. Upstream failures propagate to the caller unretried.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::classifier::classify_query;
use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::{VectorMatch, VectorStore};
use crate::tables::TableIndex;
use crate::types::{Chunk, ChunkMetadata, ContentType, QueryType};

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Nearest neighbours requested from the vector index
    pub top_k: usize,
    /// Hard relevance floor on cosine similarity; a precision guard, not a
    /// ranking signal
    pub similarity_floor: f32,
    /// Cap on the returned evidence set
    pub max_results: usize,
    /// Fiscal year assumed when stored metadata is missing one
    pub default_fiscal_year: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 12,
            similarity_floor: 0.65,
            max_results: 8,
            default_fiscal_year: "2026-27".to_string(),
        }
    }
}

/// Hybrid retriever over the vector index and the structured table index
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    tables: TableIndex,
    params: SearchParams,
}

impl Retriever {
    /// Create a retriever with default search parameters.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, tables: TableIndex) -> Self {
        Self::with_params(embedder, store, tables, SearchParams::default())
    }

    /// Create a retriever with custom search parameters.
    pub fn with_params(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        tables: TableIndex,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            tables,
            params,
        }
    }

    /// Retrieve evidence chunks for a query.
    ///
    /// Out-of-scope queries return an empty set without any network call.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        let query_type = classify_query(query);
        self.retrieve_classified(query, query_type).await
    }

    /// Retrieve with an already-computed query type, so callers that also
    /// need the classification do not classify twice.
    pub async fn retrieve_classified(
        &self,
        query: &str,
        query_type: QueryType,
    ) -> Result<Vec<Chunk>> {
        if query_type == QueryType::OutOfScope {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).await?;
        let matches = self.store.query(&embedding, self.params.top_k).await?;

        let mut semantic: Vec<Chunk> = matches
            .into_iter()
            .filter(|m| m.score >= self.params.similarity_floor)
            .map(|m| self.chunk_from_match(m))
            .collect();
        semantic.truncate(self.params.max_results);

        debug!(
            query_type = ?query_type,
            semantic = semantic.len(),
            "semantic retrieval complete"
        );

        // Fact and comparison questions also consult the curated tables,
        // which take priority in the merged order
        if matches!(query_type, QueryType::Factual | QueryType::Comparison) {
            let mut merged = self.tables.search(query);
            merged.extend(semantic);
            let mut merged = deduplicate_chunks(merged);
            merged.truncate(self.params.max_results);
            return Ok(merged);
        }

        Ok(semantic)
    }

    /// Map a vector match into a chunk, defaulting missing metadata.
    fn chunk_from_match(&self, m: VectorMatch) -> Chunk {
        let meta = &m.metadata;

        Chunk {
            id: m.id,
            content: meta_string(meta, "content").unwrap_or_default(),
            metadata: ChunkMetadata {
                document_name: meta_string(meta, "document_name").unwrap_or_default(),
                // Default to 1 so the citation invariant (page >= 1) holds
                page_number: meta_u32(meta, "page_number").unwrap_or(1),
                section_title: meta_string(meta, "section_title").unwrap_or_default(),
                content_type: meta_string(meta, "content_type")
                    .and_then(|s| parse_content_type(&s))
                    .unwrap_or(ContentType::Narrative),
                department: meta_string(meta, "department"),
                fiscal_year: meta_string(meta, "fiscal_year")
                    .unwrap_or_else(|| self.params.default_fiscal_year.clone()),
            },
            score: Some(m.score),
        }
    }
}

/// Drop duplicates while preserving first-seen order. Keyed by id, falling
/// back to a content prefix when the id is absent.
fn deduplicate_chunks(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|c| {
            let key = if c.id.is_empty() {
                c.content.chars().take(80).collect::<String>()
            } else {
                c.id.clone()
            };
            seen.insert(key)
        })
        .collect()
}

fn meta_string(meta: &std::collections::HashMap<String, JsonValue>, key: &str) -> Option<String> {
    meta.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn meta_u32(meta: &std::collections::HashMap<String, JsonValue>, key: &str) -> Option<u32> {
    meta.get(key).and_then(|v| v.as_u64()).map(|n| n as u32)
}

fn parse_content_type(s: &str) -> Option<ContentType> {
    match s {
        "narrative" => Some(ContentType::Narrative),
        "table" => Some(ContentType::Table),
        "summary" => Some(ContentType::Summary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructuredTable;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder fake that counts calls and returns a constant vector
    struct FakeEmbedder {
        calls: AtomicUsize,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![0.1; 4]).collect())
        }
    }

    /// Store fake that serves a preset ranked match list
    struct FakeStore {
        matches: Vec<VectorMatch>,
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn upsert(&self, _records: Vec<crate::index::VectorRecord>) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }
    }

    fn vector_match(id: &str, score: f32) -> VectorMatch {
        let mut metadata = HashMap::new();
        metadata.insert(
            "content".to_string(),
            JsonValue::String(format!("content of {id}")),
        );
        metadata.insert(
            "document_name".to_string(),
            JsonValue::String("Budget 2026-27 (Main)".to_string()),
        );
        metadata.insert("page_number".to_string(), JsonValue::Number(4.into()));
        metadata.insert(
            "content_type".to_string(),
            JsonValue::String("narrative".to_string()),
        );
        VectorMatch {
            id: id.to_string(),
            score,
            metadata,
        }
    }

    fn health_table() -> StructuredTable {
        StructuredTable {
            id: "investments".to_string(),
            title: "Key Investments".to_string(),
            document_name: "Budget Highlights".to_string(),
            page_number: 3,
            section: "Key Investments".to_string(),
            department: Some("Health and Wellness".to_string()),
            fiscal_year: "2026-27".to_string(),
            columns: vec!["Department".into(), "Estimate".into()],
            rows: vec![HashMap::from([
                (
                    "Department".to_string(),
                    JsonValue::String("Health and Wellness".to_string()),
                ),
                (
                    "Estimate".to_string(),
                    JsonValue::String("$6.7B".to_string()),
                ),
            ])],
            notes: None,
            keywords: vec!["health".to_string()],
        }
    }

    fn retriever(matches: Vec<VectorMatch>, tables: Vec<StructuredTable>) -> Retriever {
        Retriever::new(
            Arc::new(FakeEmbedder::new()),
            Arc::new(FakeStore { matches }),
            TableIndex::new(tables),
        )
    }

    #[tokio::test]
    async fn test_out_of_scope_short_circuits_without_network() {
        let embedder = Arc::new(FakeEmbedder::new());
        let r = Retriever::new(
            embedder.clone(),
            Arc::new(FakeStore {
                matches: vec![vector_match("a", 0.9)],
            }),
            TableIndex::new(vec![]),
        );

        let chunks = r.retrieve("What is the weather today?").await.unwrap();
        assert!(chunks.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_similarity_floor_filters_weak_matches() {
        let r = retriever(
            vec![
                vector_match("strong", 0.8),
                vector_match("borderline", 0.65),
                vector_match("weak", 0.64),
            ],
            vec![],
        );

        let chunks = r.retrieve("Tell me about rural healthcare plans").await.unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "borderline"]);
    }

    #[tokio::test]
    async fn test_semantic_results_capped() {
        let matches: Vec<VectorMatch> = (0..12)
            .map(|i| vector_match(&format!("m{i}"), 0.9 - i as f32 * 0.01))
            .collect();
        let r = retriever(matches, vec![]);

        let chunks = r.retrieve("Overview of the capital plan").await.unwrap();
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[0].id, "m0");
    }

    #[tokio::test]
    async fn test_factual_query_merges_tables_first() {
        let r = retriever(vec![vector_match("semantic", 0.9)], vec![health_table()]);

        let chunks = r
            .retrieve("How much is being spent on health?")
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "table:investments");
        assert_eq!(chunks[0].metadata.content_type, ContentType::Table);
        assert_eq!(chunks[1].id, "semantic");
    }

    #[tokio::test]
    async fn test_exploratory_query_skips_tables() {
        let r = retriever(vec![vector_match("semantic", 0.9)], vec![health_table()]);

        // Exploratory: no table lookup even though "health" would match
        let chunks = r.retrieve("Tell me about healthy school food").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "semantic");
    }

    #[tokio::test]
    async fn test_metadata_defaults() {
        let bare = VectorMatch {
            id: "bare".to_string(),
            score: 0.7,
            metadata: HashMap::new(),
        };
        let r = retriever(vec![bare], vec![]);

        let chunks = r.retrieve("Describe the long-term outlook").await.unwrap();
        assert_eq!(chunks[0].metadata.page_number, 1);
        assert_eq!(chunks[0].metadata.content_type, ContentType::Narrative);
        assert_eq!(chunks[0].metadata.fiscal_year, "2026-27");
        assert_eq!(chunks[0].score, Some(0.7));
    }

    #[test]
    fn test_deduplicate_preserves_first_seen_order() {
        let a = Chunk {
            id: "a".to_string(),
            content: "first".to_string(),
            metadata: chunk_meta(),
            score: Some(0.9),
        };
        let a_again = Chunk {
            score: Some(0.5),
            ..a.clone()
        };
        let b = Chunk {
            id: "b".to_string(),
            content: "second".to_string(),
            metadata: chunk_meta(),
            score: Some(0.8),
        };

        let deduped = deduplicate_chunks(vec![a.clone(), b.clone(), a_again]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[0].score, Some(0.9));
        assert_eq!(deduped[1].id, "b");
    }

    #[test]
    fn test_deduplicate_falls_back_to_content_prefix() {
        let mut a = Chunk {
            id: String::new(),
            content: "same content prefix".to_string(),
            metadata: chunk_meta(),
            score: None,
        };
        let b = a.clone();
        a.score = Some(0.9);

        let deduped = deduplicate_chunks(vec![a, b]);
        assert_eq!(deduped.len(), 1);
    }

    fn chunk_meta() -> ChunkMetadata {
        ChunkMetadata {
            document_name: "Budget 2026-27 (Main)".to_string(),
            page_number: 1,
            section_title: String::new(),
            content_type: ContentType::Narrative,
            department: None,
            fiscal_year: "2026-27".to_string(),
        }
    }
}
