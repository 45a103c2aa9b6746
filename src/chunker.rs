//! Content-aware document chunking
//!
//! Splits extracted per-page text into overlapping, size-bounded passages.
//! Summary documents become a single capped chunk; everything else is
//! windowed over paragraphs with trailing overlap so passages that straddle
//! a chunk boundary stay readable in both neighbours.

use uuid::Uuid;

use crate::types::{truncate_chars, Chunk, ChunkMetadata, ContentType, DocInfo, PageContent};

/// Target chunk size in tokens
const TARGET_CHUNK_TOKENS: usize = 650;
/// Overlap carried into the next chunk, in tokens
const OVERLAP_TOKENS: usize = 100;
/// Rough approximation: 1 token ≈ 4 chars
const CHARS_PER_TOKEN: usize = 4;
const TARGET_CHUNK_CHARS: usize = TARGET_CHUNK_TOKENS * CHARS_PER_TOKEN;
const OVERLAP_CHARS: usize = OVERLAP_TOKENS * CHARS_PER_TOKEN;

/// Paragraphs shorter than this are treated as noise and dropped
const MIN_PARAGRAPH_CHARS: usize = 40;
/// Hard cap for single-chunk summary documents
const SUMMARY_CONTENT_CAP: usize = 8000;
/// Detected section titles are truncated to this length
const SECTION_TITLE_CAP: usize = 120;

struct Paragraph {
    text: String,
    page_number: u32,
}

/// Split a document's pages into chunks with provenance metadata.
///
/// Deterministic apart from the generated chunk ids. A document with no
/// paragraph above the noise threshold yields zero chunks; callers report
/// that as a processing anomaly rather than an error.
pub fn chunk_document(pages: &[PageContent], doc_info: &DocInfo) -> Vec<Chunk> {
    // Summary docs are small enough to keep whole
    if doc_info.content_type == ContentType::Summary {
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        return vec![Chunk {
            id: Uuid::new_v4().to_string(),
            content: truncate_chars(&full_text, SUMMARY_CONTENT_CAP).to_string(),
            metadata: ChunkMetadata {
                document_name: doc_info.document_name.clone(),
                page_number: 1,
                section_title: doc_info.document_name.clone(),
                content_type: ContentType::Summary,
                department: None,
                fiscal_year: doc_info.fiscal_year.clone(),
            },
            score: None,
        }];
    }

    // Flatten pages into one ordered paragraph list
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    for page in pages {
        for para in split_paragraphs(&page.text) {
            paragraphs.push(Paragraph {
                text: para,
                page_number: page.page_number,
            });
        }
    }

    let mut chunks = Vec::new();
    let mut i = 0;

    while i < paragraphs.len() {
        let start_page = paragraphs[i].page_number;
        let mut chunk_text = String::new();
        let mut j = i;

        // Accumulate paragraphs until the target size is reached
        while j < paragraphs.len() && chunk_text.len() < TARGET_CHUNK_CHARS {
            if !chunk_text.is_empty() {
                chunk_text.push_str("\n\n");
            }
            chunk_text.push_str(&paragraphs[j].text);
            j += 1;
        }

        let section_title = detect_section_title(&chunk_text);

        chunks.push(Chunk {
            id: Uuid::new_v4().to_string(),
            content: chunk_text,
            metadata: ChunkMetadata {
                document_name: doc_info.document_name.clone(),
                page_number: start_page,
                section_title,
                content_type: doc_info.content_type,
                department: None,
                fiscal_year: doc_info.fiscal_year.clone(),
            },
            score: None,
        });

        // Walk backward from the chunk's end accumulating paragraph lengths
        // until the overlap target, then resume the window there. Always
        // advances by at least one paragraph so the loop terminates.
        let mut overlap_chars = 0;
        let mut backtrack = j - 1;
        while backtrack > i && overlap_chars < OVERLAP_CHARS {
            overlap_chars += paragraphs[backtrack].text.len();
            backtrack -= 1;
        }
        i = (i + 1).max(backtrack + 1);
    }

    chunks
}

/// Split page text on blank-line boundaries, dropping noise fragments.
fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .flat_map(|block| block.split("\r\n\r\n"))
        .map(str::trim)
        .filter(|p| p.len() > MIN_PARAGRAPH_CHARS)
        .map(str::to_string)
        .collect()
}

/// Detect a heading-shaped section title at the start of any line.
///
/// Two patterns, checked in order on each line (first match wins):
/// 1. an all-caps phrase of at least 5 characters, as printed in government
///    PDF section headers;
/// 2. a numbered-heading prefix ("3." or "2.1.") followed by a capitalized
///    word, in which case the whole line is the title.
///
/// No match yields an empty title.
fn detect_section_title(text: &str) -> String {
    for line in text.lines() {
        if let Some(title) = match_all_caps_heading(line) {
            return truncate_chars(title, SECTION_TITLE_CAP).trim().to_string();
        }
        if matches_numbered_heading(line) {
            return truncate_chars(line.trim(), SECTION_TITLE_CAP).to_string();
        }
    }
    String::new()
}

/// Longest prefix of uppercase letters, spaces and header punctuation, if it
/// is long enough to look like a heading.
fn match_all_caps_heading(line: &str) -> Option<&str> {
    if !line.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let end = line
        .find(|c: char| !(c.is_ascii_uppercase() || matches!(c, ' ' | '&' | ',' | '\'' | '-')))
        .unwrap_or(line.len());
    let candidate = line[..end].trim_end();
    if candidate.len() >= 5 {
        Some(candidate)
    } else {
        None
    }
}

/// One or more "digits." groups, whitespace, then a capitalized word.
fn matches_numbered_heading(line: &str) -> bool {
    let mut rest = line;
    let mut groups = 0;

    loop {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || !rest[digits..].starts_with('.') {
            break;
        }
        groups += 1;
        rest = &rest[digits + 1..];
    }

    if groups == 0 {
        return false;
    }

    let trimmed = rest.trim_start();
    trimmed != rest && trimmed.starts_with(|c: char| c.is_ascii_uppercase())
}
