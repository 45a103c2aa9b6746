//! End-to-end retrieval pipeline: classify → retrieve → rerank → assemble
//!
//! Stateless per request; all shared state is immutable configuration, so
//! concurrent invocations need no locks. The assembled context and system
//! prompt are the pipeline's hand-off to the external generation capability.

use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::classify_query;
use crate::context::{assemble_context, ContextConfig};
use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::VectorStore;
use crate::prompts::build_system_prompt;
use crate::reranker::{Reranker, RerankConfig};
use crate::retriever::{Retriever, SearchParams};
use crate::tables::TableIndex;
use crate::types::QueryType;

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub search: SearchParams,
    pub rerank: RerankConfig,
    pub context: ContextConfig,
}

/// Pipeline output for one query
#[derive(Debug, Clone)]
pub struct RagResult {
    pub query: String,
    pub query_type: QueryType,
    /// Assembled evidence block; empty means "no evidence", not an error
    pub context: String,
    /// System prompt with the context filled in, ready for generation
    pub system_prompt: String,
    pub chunks_retrieved: usize,
    pub chunks_included: usize,
}

/// End-to-end RAG pipeline
pub struct RagPipeline {
    retriever: Retriever,
    reranker: Reranker,
    context_config: ContextConfig,
}

impl RagPipeline {
    /// Create a pipeline with default configuration.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        tables: TableIndex,
    ) -> Self {
        Self::with_config(embedder, store, tables, PipelineConfig::default())
    }

    /// Create a pipeline with custom configuration.
    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        tables: TableIndex,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever: Retriever::with_params(embedder, store, tables, config.search),
            reranker: Reranker::with_config(config.rerank),
            context_config: config.context,
        }
    }

    /// Run the full pipeline for one query.
    ///
    /// Out-of-scope queries skip retrieval entirely and come back with an
    /// empty context; the caller replies with the fixed scope message
    /// instead of invoking generation. Upstream service failures propagate
    /// so the caller can degrade to a neutral "no evidence" context.
    pub async fn execute(&self, query: &str) -> Result<RagResult> {
        let query_type = classify_query(query);

        if query_type == QueryType::OutOfScope {
            info!("query classified out of scope, skipping retrieval");
            return Ok(RagResult {
                query: query.to_string(),
                query_type,
                context: String::new(),
                system_prompt: build_system_prompt(""),
                chunks_retrieved: 0,
                chunks_included: 0,
            });
        }

        let retrieved = self.retriever.retrieve_classified(query, query_type).await?;
        let chunks_retrieved = retrieved.len();

        let ranked = self.reranker.rerank(query, &retrieved);
        let context = assemble_context(&ranked, self.context_config.max_tokens);

        let chunks_included = if context.is_empty() {
            0
        } else {
            context.matches("[Source:").count()
        };

        debug!(
            query_type = ?query_type,
            retrieved = chunks_retrieved,
            included = chunks_included,
            context_chars = context.chars().count(),
            "pipeline complete"
        );

        Ok(RagResult {
            query: query.to_string(),
            query_type,
            system_prompt: build_system_prompt(&context),
            context,
            chunks_retrieved,
            chunks_included,
        })
    }
}
