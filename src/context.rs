//! Token-budgeted context assembly
//!
//! Greedily selects top-ranked evidence under a character budget derived
//! from the token budget, and serializes it with source citations. Evidence
//! units are atomic: a chunk that would overflow the budget ends selection,
//! so the generation step never sees a truncated, possibly misleading
//! fragment.

use serde::{Deserialize, Serialize};

use crate::types::Chunk;

/// Rough approximation: 1 token ≈ 4 chars
pub const CHARS_PER_TOKEN: usize = 4;

/// Delimiter between included chunks
const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token budget for the assembled evidence block
    pub max_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_tokens: 7000 }
    }
}

/// Assemble ranked chunks into a citation-annotated context string.
///
/// Walks the ranked sequence in order, including a chunk only while its full
/// content fits the budget; stops at the first overflow. Returns an empty
/// string when nothing fits, which callers treat as "no evidence", not as an
/// error.
pub fn assemble_context(ranked: &[Chunk], max_tokens: usize) -> String {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let mut total_chars = 0;
    let mut selected = Vec::new();

    for chunk in ranked {
        let chunk_chars = chunk.content.chars().count();
        if total_chars + chunk_chars > max_chars {
            break;
        }
        selected.push(chunk);
        total_chars += chunk_chars;
    }

    selected
        .iter()
        .map(|c| format!("{}\n{}", citation_header(c), c.content))
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER)
}

/// `[Source: <document>, p.<page>, <section?>]`
fn citation_header(chunk: &Chunk) -> String {
    let meta = &chunk.metadata;
    if meta.section_title.is_empty() {
        format!("[Source: {}, p.{}]", meta.document_name, meta.page_number)
    } else {
        format!(
            "[Source: {}, p.{}, {}]",
            meta.document_name, meta.page_number, meta.section_title
        )
    }
}
