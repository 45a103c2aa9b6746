//! Multi-signal reranking of retrieved evidence
//!
//! Rescales candidate relevance with domain-specific multiplicative boosts,
//! expressed as an ordered, inspectable rule table rather than inline
//! conditionals. Boosts compose: a chunk can receive several. The final
//! order is a stable descending sort, so ties keep the upstream merge
//! priority (table results before semantic results).

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, ContentType};

/// Department and sector keywords matched between query and chunk metadata
pub const DEPARTMENT_KEYWORDS: &[&str] = &[
    "health",
    "education",
    "housing",
    "justice",
    "environment",
    "transportation",
    "finance",
    "community",
    "labour",
    "energy",
    "agriculture",
    "tourism",
];

/// Financial vocabulary that marks a query as money-focused
const FINANCIAL_TERMS: &[&str] = &[
    "billion", "million", "budget", "deficit", "revenue", "expense", "spending",
];

/// Signal a boost rule keys on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostCondition {
    /// Financial query and the chunk is structured (table or summary)
    FinancialStructured,
    /// Summary chunk from a highlights document
    HighlightsSummary,
    /// Query names a department the chunk's metadata matches
    DepartmentMatch,
    /// Financial query and the chunk comes from an estimates document
    FinancialEstimates,
}

/// One rerank rule: a predicate and its score multiplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostRule {
    pub condition: BoostCondition,
    pub multiplier: f32,
}

/// Re-ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Applied when a chunk arrives without a score
    pub default_score: f32,
    /// Rules applied independently; every matching rule multiplies the score
    pub rules: Vec<BoostRule>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            default_score: 0.5,
            rules: vec![
                BoostRule {
                    condition: BoostCondition::FinancialStructured,
                    multiplier: 1.5,
                },
                BoostRule {
                    condition: BoostCondition::HighlightsSummary,
                    multiplier: 1.2,
                },
                BoostRule {
                    condition: BoostCondition::DepartmentMatch,
                    multiplier: 1.3,
                },
                BoostRule {
                    condition: BoostCondition::FinancialEstimates,
                    multiplier: 1.1,
                },
            ],
        }
    }
}

/// Query signals computed once per rerank call
#[derive(Debug, Clone)]
struct QuerySignals {
    financial: bool,
    department: Option<String>,
}

impl QuerySignals {
    fn from_query(query: &str) -> Self {
        let lower = query.to_lowercase();
        Self {
            financial: contains_dollar_amount(query)
                || FINANCIAL_TERMS.iter().any(|t| lower.contains(t)),
            department: DEPARTMENT_KEYWORDS
                .iter()
                .find(|d| lower.contains(**d))
                .map(|d| d.to_string()),
        }
    }
}

impl BoostRule {
    fn applies(&self, signals: &QuerySignals, chunk: &Chunk) -> bool {
        match self.condition {
            BoostCondition::FinancialStructured => {
                signals.financial
                    && matches!(
                        chunk.metadata.content_type,
                        ContentType::Table | ContentType::Summary
                    )
            }
            BoostCondition::HighlightsSummary => {
                chunk.metadata.content_type == ContentType::Summary
                    && chunk
                        .metadata
                        .document_name
                        .to_lowercase()
                        .contains("highlight")
            }
            BoostCondition::DepartmentMatch => match (&signals.department, &chunk.metadata.department) {
                (Some(target), Some(dept)) => dept.to_lowercase().contains(target),
                _ => false,
            },
            BoostCondition::FinancialEstimates => {
                signals.financial
                    && chunk
                        .metadata
                        .document_name
                        .to_lowercase()
                        .contains("estimate")
            }
        }
    }
}

/// Reranker applying the configured boost rules
pub struct Reranker {
    config: RerankConfig,
}

impl Reranker {
    /// Create a reranker with the default rule table.
    pub fn new() -> Self {
        Self {
            config: RerankConfig::default(),
        }
    }

    /// Create with a custom configuration.
    pub fn with_config(config: RerankConfig) -> Self {
        Self { config }
    }

    /// Rerank chunks: returns a new sequence sorted descending by boosted
    /// score. Non-destructive; the input order breaks ties.
    pub fn rerank(&self, query: &str, chunks: &[Chunk]) -> Vec<Chunk> {
        let signals = QuerySignals::from_query(query);

        let mut ranked: Vec<Chunk> = chunks
            .iter()
            .map(|chunk| {
                let mut score = chunk.score.unwrap_or(self.config.default_score);
                for rule in &self.config.rules {
                    if rule.applies(&signals, chunk) {
                        score *= rule.multiplier;
                    }
                }
                Chunk {
                    score: Some(score),
                    ..chunk.clone()
                }
            })
            .collect();

        // Stable sort keeps relative input order on ties
        ranked.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .partial_cmp(&a.score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
    }

    /// Current configuration
    pub fn config(&self) -> &RerankConfig {
        &self.config
    }
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the query contains a dollar amount: '$' directly followed by a
/// digit.
fn contains_dollar_amount(query: &str) -> bool {
    let bytes = query.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'$' && w[1].is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn chunk(id: &str, content_type: ContentType, score: Option<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: "evidence text".to_string(),
            metadata: ChunkMetadata {
                document_name: "Budget 2026-27 (Main)".to_string(),
                page_number: 2,
                section_title: String::new(),
                content_type,
                department: None,
                fiscal_year: "2026-27".to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_financial_query_boosts_table_chunk() {
        let reranker = Reranker::new();
        let table = chunk("t", ContentType::Table, Some(0.6));
        let narrative = chunk("n", ContentType::Narrative, Some(0.6));

        let ranked = reranker.rerank("total spending this year", &[narrative, table]);

        assert_eq!(ranked[0].id, "t");
        // Exactly the structured-content multiplier
        assert!((ranked[0].score.unwrap() - 0.9).abs() < 1e-6);
        assert!((ranked[1].score.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_non_financial_query_leaves_table_unboosted() {
        let reranker = Reranker::new();
        let table = chunk("t", ContentType::Table, Some(0.6));

        let ranked = reranker.rerank("describe the consultation process", &[table]);
        assert!((ranked[0].score.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_dollar_amount_counts_as_financial() {
        let reranker = Reranker::new();
        let table = chunk("t", ContentType::Table, Some(0.6));

        let ranked = reranker.rerank("where does the $500 fee go", &[table]);
        assert!((ranked[0].score.unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_highlights_summary_boost() {
        let reranker = Reranker::new();
        let mut summary = chunk("s", ContentType::Summary, Some(0.5));
        summary.metadata.document_name = "Budget Highlights".to_string();

        // Non-financial query: only the highlights boost applies
        let ranked = reranker.rerank("give me an overview", &[summary]);
        assert!((ranked[0].score.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_department_boost() {
        let reranker = Reranker::new();
        let mut with_dept = chunk("d", ContentType::Narrative, Some(0.5));
        with_dept.metadata.department = Some("Health and Wellness".to_string());
        let without = chunk("n", ContentType::Narrative, Some(0.5));

        let ranked = reranker.rerank("what about health services", &[without, with_dept]);
        assert_eq!(ranked[0].id, "d");
        assert!((ranked[0].score.unwrap() - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_boosts_compose() {
        let reranker = Reranker::new();
        let mut estimates_table = chunk("e", ContentType::Table, Some(0.5));
        estimates_table.metadata.document_name = "Estimates & Supplementary Detail".to_string();

        // Financial + table (x1.5) and financial + estimates (x1.1)
        let ranked = reranker.rerank("total budget by department", &[estimates_table]);
        assert!((ranked[0].score.unwrap() - 0.5 * 1.5 * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_missing_score_defaults() {
        let reranker = Reranker::new();
        let ranked = reranker.rerank(
            "describe the consultation process",
            &[chunk("n", ContentType::Narrative, None)],
        );
        assert_eq!(ranked[0].score, Some(0.5));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let reranker = Reranker::new();
        let first = chunk("first", ContentType::Narrative, Some(0.7));
        let second = chunk("second", ContentType::Narrative, Some(0.7));

        let ranked = reranker.rerank("describe the consultation process", &[first, second]);
        assert_eq!(ranked[0].id, "first");
        assert_eq!(ranked[1].id, "second");
    }

    #[test]
    fn test_rerank_is_non_destructive() {
        let reranker = Reranker::new();
        let input = vec![chunk("a", ContentType::Table, Some(0.6))];

        let _ranked = reranker.rerank("total spending", &input);
        // Original collection keeps its pre-rerank score
        assert_eq!(input[0].score, Some(0.6));
    }

    #[test]
    fn test_empty_input_flows_through() {
        let reranker = Reranker::new();
        assert!(reranker.rerank("budget question", &[]).is_empty());
    }
}
