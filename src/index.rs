//! Vector index access
//!
//! `VectorStore` is the seam between the pipeline and the external index:
//! upsert for the offline flow, cosine-similarity query for the online path.
//! The Qdrant implementation mirrors the configured 1024-dim cosine space
//! and truncates stored content to the metadata size cap.

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, CreateCollection,
        Distance, PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::errors::{PipelineError, Result};
use crate::types::truncate_chars;

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "budget_chunks";

/// Stored content is truncated to this many characters to respect
/// index-side metadata limits
pub const METADATA_CONTENT_CAP: usize = 2000;

/// A record to upsert into the index
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    /// Plain scalar metadata values only
    pub metadata: HashMap<String, JsonValue>,
}

/// A ranked match returned by a similarity query
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    /// Cosine similarity score
    pub score: f32,
    pub metadata: HashMap<String, JsonValue>,
}

/// Vector index capability, injected into the retriever and indexer so
/// tests can substitute a fake.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert records into the index.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Query the nearest neighbours of `vector`, ranked by similarity,
    /// with metadata included.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;
}

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: QdrantClient,
    collection: String,
    dimension: u64,
}

impl QdrantIndex {
    /// Connect to Qdrant and ensure the collection exists.
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;

        let index = Self {
            client,
            collection: collection.to_string(),
            dimension: dimension as u64,
        };
        index.ensure_collection().await?;

        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: self.dimension,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;
        }

        Ok(())
    }

    /// Number of points in the collection
    pub async fn point_count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}

#[async_trait]
impl VectorStore for QdrantIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let mut payload = HashMap::new();
                for (key, value) in record.metadata {
                    payload.insert(key, json_to_qdrant_value(value));
                }
                PointStruct::new(record.id, record.vector, payload)
            })
            .collect();

        self.client
            .upsert_points_blocking(&self.collection, None, points, None)
            .await
            .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| PipelineError::VectorIndex(e.to_string()))?;

        let matches = search_result
            .result
            .into_iter()
            .map(|point| {
                let mut metadata = HashMap::new();
                for (key, value) in point.payload {
                    if let Some(json_val) = qdrant_to_json_value(&value) {
                        metadata.insert(key, json_val);
                    }
                }

                VectorMatch {
                    id: point_id_to_string(&point.id),
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        Ok(matches)
    }
}

/// Cap stored content to the index-side metadata limit.
pub fn cap_content_metadata(content: &str) -> String {
    truncate_chars(content, METADATA_CONTENT_CAP).to_string()
}

fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        _ => QdrantValue::from(""),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
            Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
            Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
            Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
            _ => None,
        }
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => String::new(),
            }
        })
        .unwrap_or_default()
}
