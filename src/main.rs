//! budgetchat CLI - offline processing/indexing and a query demo
//!
//! `process` and `index` drive the offline flow; `ask` runs the online
//! pipeline once and prints the assembled context. The transport layer that
//! would normally front the pipeline is out of scope here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use budgetchat::config::Config;
use budgetchat::embedding::VoyageClient;
use budgetchat::index::QdrantIndex;
use budgetchat::indexer::{process_documents, Indexer};
use budgetchat::pipeline::{PipelineConfig, RagPipeline};
use budgetchat::prompts::{NO_EVIDENCE_CONTEXT, OUT_OF_SCOPE_RESPONSE};
use budgetchat::tables::TableIndex;
use budgetchat::types::QueryType;

#[derive(Parser)]
#[command(name = "budgetchat", version, about = "RAG pipeline for provincial budget documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk extracted document pages into chunk files
    Process {
        /// Directory of extracted page JSON files
        #[arg(long, default_value = "data/pages")]
        pages_dir: PathBuf,
        /// Output directory for chunk files
        #[arg(long, default_value = "data/chunks")]
        chunks_dir: PathBuf,
    },
    /// Embed processed chunks and upsert them into the vector index
    Index {
        /// Directory holding the combined chunk file
        #[arg(long, default_value = "data/chunks")]
        chunks_dir: PathBuf,
    },
    /// Run the retrieval pipeline for one query and print the context
    Ask {
        /// The question to retrieve evidence for
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "budgetchat=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Process {
            pages_dir,
            chunks_dir,
        } => {
            let outcomes = process_documents(&config.documents, &pages_dir, &chunks_dir)?;

            let mut total = 0;
            for outcome in &outcomes {
                println!(
                    "{}: {} pages -> {} chunks",
                    outcome.document_name, outcome.page_count, outcome.chunk_count
                );
                total += outcome.chunk_count;
            }
            println!("Total chunks created: {total}");
        }

        Command::Index { chunks_dir } => {
            let chunks = Indexer::load_chunks(&chunks_dir)
                .context("No chunks found; run `budgetchat process` first")?;
            println!("Loaded {} chunks", chunks.len());

            let embedder = embedding_client(&config)?;
            let store = Arc::new(
                QdrantIndex::connect(
                    &config.index.url,
                    &config.index.collection,
                    config.embedding.dimension,
                )
                .await?,
            );

            let indexer =
                Indexer::with_config(embedder, store.clone(), config.indexing.clone());

            let bar = ProgressBar::new(chunks.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} chunks")
                    .expect("valid progress template"),
            );

            // Drive one upsert batch at a time so the bar tracks progress;
            // pacing between batches stays with the indexer config
            let slice = config.indexing.upsert_batch_size.max(1);
            let batch_count = chunks.len().div_ceil(slice);
            for (idx, batch) in chunks.chunks(slice).enumerate() {
                let written = indexer.index_chunks(batch).await?;
                bar.inc(written as u64);
                if idx + 1 < batch_count && config.indexing.batch_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(config.indexing.batch_delay_ms))
                        .await;
                }
            }
            bar.finish();

            println!(
                "Indexed {} vectors into collection '{}'",
                store.point_count().await?,
                config.index.collection
            );
        }

        Command::Ask { query } => {
            let embedder = embedding_client(&config)?;
            let store = Arc::new(
                QdrantIndex::connect(
                    &config.index.url,
                    &config.index.collection,
                    config.embedding.dimension,
                )
                .await?,
            );

            let pipeline = RagPipeline::with_config(
                embedder,
                store,
                TableIndex::builtin()?,
                PipelineConfig {
                    search: config.search.clone(),
                    rerank: config.rerank.clone(),
                    context: config.context.clone(),
                },
            );

            match pipeline.execute(&query).await {
                Ok(result) if result.query_type == QueryType::OutOfScope => {
                    println!("{OUT_OF_SCOPE_RESPONSE}");
                }
                Ok(result) => {
                    println!("Query type: {:?}", result.query_type);
                    println!(
                        "Chunks: {} retrieved, {} included",
                        result.chunks_retrieved, result.chunks_included
                    );
                    println!("\n{}", result.context);
                }
                Err(err) => {
                    // Degrade to the neutral no-evidence context instead of
                    // failing the whole request
                    eprintln!("Retrieval failed: {err}");
                    println!("{NO_EVIDENCE_CONTEXT}");
                }
            }
        }
    }

    Ok(())
}

fn embedding_client(config: &Config) -> Result<Arc<VoyageClient>> {
    let api_key =
        std::env::var("VOYAGE_API_KEY").context("Missing VOYAGE_API_KEY in environment")?;

    let client = VoyageClient::with_config(
        &config.embedding.base_url,
        &config.embedding.model,
        &api_key,
        config.embedding.batch_size,
        Duration::from_millis(config.embedding.batch_delay_ms),
    )?;

    Ok(Arc::new(client))
}
