//! Heuristic query intent classification
//!
//! An ordered decision list over the lowercased query text; the first
//! matching category wins, because the keyword sets are not mutually
//! exclusive. Pure function of the text, never of conversation history.

use crate::types::QueryType;

/// Greeting and small-talk openers that mark a query out of scope
const OUT_OF_SCOPE_OPENERS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "what's up",
    "what is up",
    "what's your name",
    "what is your name",
    "what's the weather",
    "what is the weather",
    "how are you",
];

/// Off-topic subjects that mark a query out of scope wherever they appear
const OUT_OF_SCOPE_TOPICS: &[&str] = &["weather", "sports", "recipe", "movie", "music", "joke"];

/// Comparison and trend vocabulary
const COMPARISON_TERMS: &[&str] = &[
    "compare",
    "compared to",
    "versus",
    "vs",
    "difference",
    "change from",
    "last year",
    "previous year",
    "year-over-year",
    "year over year",
    "increase",
    "decrease",
    "more than",
    "less than",
    "grew",
    "fell",
    "cut",
];

/// "what is the <X>" completions that signal a factual quantity question
const FACTUAL_WHAT_IS_THE: &[&str] = &[
    "total", "amount", "cost", "budget", "allocation", "deficit", "revenue", "expense",
];

/// "total <X>" completions that signal a factual quantity question
const FACTUAL_TOTAL: &[&str] = &["budget", "spending", "revenue", "deficit"];

/// "how many <X>" completions that signal a headcount question
const FACTUAL_HOW_MANY: &[&str] = &["fte", "position", "job", "staff"];

/// Financial-domain vocabulary; any hit makes a query factual
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "budget",
    "spending",
    "allocation",
    "fund",
    "invest",
    "cost",
    "expense",
    "revenue",
    "deficit",
    "surplus",
    "billion",
    "million",
    "dollar",
    "$",
    "fte",
    "position",
    "staff",
    "employee",
    "percent",
    "%",
    "tax",
    "transfer",
];

/// Explanatory vocabulary
const EXPLANATION_TERMS: &[&str] = &[
    "why",
    "explain",
    "what does",
    "how does",
    "what is the reason",
    "purpose",
    "mean for",
    "impact",
    "effect",
];

/// Classify a query by intent category.
///
/// Consumed twice downstream: `OutOfScope` short-circuits retrieval
/// entirely, and `Factual`/`Comparison` additionally trigger the structured
/// table lookup.
pub fn classify_query(query: &str) -> QueryType {
    let lower = query.to_lowercase();

    if OUT_OF_SCOPE_OPENERS.iter().any(|p| lower.starts_with(p))
        || OUT_OF_SCOPE_TOPICS.iter().any(|t| lower.contains(t))
    {
        return QueryType::OutOfScope;
    }

    if COMPARISON_TERMS.iter().any(|t| lower.contains(t)) {
        return QueryType::Comparison;
    }

    let asks_quantity = lower.contains("how much")
        || FACTUAL_WHAT_IS_THE
            .iter()
            .any(|t| lower.contains(&format!("what is the {t}")))
        || FACTUAL_TOTAL
            .iter()
            .any(|t| lower.contains(&format!("total {t}")))
        || FACTUAL_HOW_MANY
            .iter()
            .any(|t| lower.contains(&format!("how many {t}")));

    if asks_quantity || FINANCIAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return QueryType::Factual;
    }

    if EXPLANATION_TERMS.iter().any(|t| lower.contains(t)) {
        return QueryType::Explanation;
    }

    QueryType::Exploratory
}
