//! Application configuration
//!
//! All tuning constants — similarity floor, boost multipliers, caps, token
//! budgets — are data here, not code, so they can be inspected and adjusted
//! without touching pipeline control flow. Loaded from TOML, with defaults
//! matching the shipped pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::context::ContextConfig;
use crate::indexer::{DocumentSpec, IndexingConfig};
use crate::reranker::RerankConfig;
use crate::retriever::SearchParams;
use crate::types::{ContentType, DocInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchParams,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    /// Source document catalog for the offline processing flow
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// Pause between consecutive embedding batches (milliseconds)
    pub batch_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: crate::embedding::DEFAULT_EMBEDDING_URL.to_string(),
            model: crate::embedding::DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: crate::embedding::EMBEDDING_DIM,
            batch_size: crate::embedding::EMBED_BATCH_SIZE,
            batch_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: crate::index::DEFAULT_COLLECTION.to_string(),
        }
    }
}

fn default_documents() -> Vec<DocumentSpec> {
    let doc = |pages_file: &str, name: &str, content_type: ContentType| DocumentSpec {
        pages_file: pages_file.to_string(),
        doc_info: DocInfo {
            document_name: name.to_string(),
            content_type,
            fiscal_year: "2026-27".to_string(),
        },
    };

    vec![
        doc(
            "budget-main-2026-27.json",
            "Budget 2026-27 (Main)",
            ContentType::Narrative,
        ),
        doc(
            "budget-address-2026-27.json",
            "Budget Address",
            ContentType::Narrative,
        ),
        doc(
            "budget-estimates-2026-27.json",
            "Estimates & Supplementary Detail",
            ContentType::Narrative,
        ),
        doc(
            "budget-highlights-2026-27.json",
            "Budget Highlights",
            ContentType::Summary,
        ),
        doc(
            "government-business-plan-2026-27.json",
            "Government Business Plan",
            ContentType::Narrative,
        ),
        doc(
            "additional-appropriations-2026-27.json",
            "Additional Appropriations",
            ContentType::Summary,
        ),
    ]
}

impl Config {
    /// Load configuration from file, creating the default if it doesn't
    /// exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".budgetchat").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            search: SearchParams::default(),
            rerank: RerankConfig::default(),
            context: ContextConfig::default(),
            indexing: IndexingConfig::default(),
            documents: default_documents(),
        }
    }
}
