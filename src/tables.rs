//! Structured table index over hand-curated tabular facts
//!
//! A small fixed set of tables, each searchable by keyword. A match renders
//! the table into one synthetic chunk with a fixed high score, reflecting
//! curated-data confidence above any similarity-based score. Loaded once,
//! never mutated at runtime.

use crate::errors::Result;
use crate::types::{Chunk, ChunkMetadata, ContentType, StructuredTable};

/// Score assigned to every table-derived chunk
pub const TABLE_CHUNK_SCORE: f32 = 0.95;

const FISCAL_SUMMARY_JSON: &str = include_str!("../data/tables/fiscal_summary.json");
const KEY_INVESTMENTS_JSON: &str = include_str!("../data/tables/key_investments.json");

/// Keyword-searchable index over the curated tables
#[derive(Debug, Clone)]
pub struct TableIndex {
    tables: Vec<StructuredTable>,
}

impl TableIndex {
    /// Load the built-in curated tables.
    pub fn builtin() -> Result<Self> {
        let tables = vec![
            serde_json::from_str(FISCAL_SUMMARY_JSON)?,
            serde_json::from_str(KEY_INVESTMENTS_JSON)?,
        ];
        Ok(Self { tables })
    }

    /// Build an index over an explicit table set.
    pub fn new(tables: Vec<StructuredTable>) -> Self {
        Self { tables }
    }

    /// Number of tables in the index
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Return one rendered chunk per table whose keywords appear as a
    /// substring of the lowercased query.
    pub fn search(&self, query: &str) -> Vec<Chunk> {
        let lower = query.to_lowercase();

        self.tables
            .iter()
            .filter(|table| {
                table
                    .keywords
                    .iter()
                    .any(|kw| lower.contains(&kw.to_lowercase()))
            })
            .map(table_to_chunk)
            .collect()
    }
}

fn table_to_chunk(table: &StructuredTable) -> Chunk {
    Chunk {
        id: format!("table:{}", table.id),
        content: render_table(table),
        metadata: ChunkMetadata {
            document_name: table.document_name.clone(),
            page_number: table.page_number,
            section_title: table.section.clone(),
            content_type: ContentType::Table,
            department: table.department.clone(),
            fiscal_year: table.fiscal_year.clone(),
        },
        score: Some(TABLE_CHUNK_SCORE),
    }
}

/// Render a table deterministically: title/source line, header row,
/// separator, one line per data row, optional trailing note.
fn render_table(table: &StructuredTable) -> String {
    let header = format!(
        "**{}** ({}, p.{})\n",
        table.title, table.document_name, table.page_number
    );
    let col_header = table.columns.join(" | ");
    let separator = table
        .columns
        .iter()
        .map(|_| "---")
        .collect::<Vec<_>>()
        .join(" | ");
    let rows = table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .map(|col| row.get(col).map(cell_to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n");
    let notes = table
        .notes
        .as_deref()
        .map(|n| format!("\n_Note: {n}_"))
        .unwrap_or_default();

    format!("{header}{col_header}\n{separator}\n{rows}{notes}")
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
