// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based draft quality validation.
//!
//! Each component check is a pure function of (query, draft) returning a
//! score in [0, 1]. The aggregate is a weighted mean using the domain's
//! configured weights. No network calls happen on the default path; embedding
//! similarity is an opt-in upgrade of the alignment check.

use std::collections::HashSet;
use std::sync::Arc;

use draftwise_config::model::{ComponentFloors, QualityConfig, QualityWeights};
use draftwise_core::traits::embedding::cosine_similarity;
use draftwise_core::{Domain, EmbeddingAdapter, PluginAdapter};
use serde::Serialize;
use tracing::{debug, warn};

use crate::text::{count_phrase, key_terms, sentences, term_present, tokens};

/// Hedge phrases, matched on word boundaries.
const HEDGE_PHRASES: &[&str] = &[
    "i'm not sure", "i am not sure", "not sure", "it depends", "i think", "i believe",
    "maybe", "perhaps", "possibly", "probably", "might", "could be", "hard to say",
    "i don't know", "i do not know", "not certain", "unclear", "as an ai", "i guess",
    "it seems", "generally speaking", "in some cases",
];

/// Abusive terms reported by the toxicity component.
const TOXIC_TERMS: &[&str] = &[
    "idiot", "stupid", "moron", "dumb", "shut up", "hate you", "loser", "pathetic",
    "worthless", "kill yourself",
];

/// Characters that may legitimately end a complete answer.
const TERMINAL_CHARS: &[char] = &['.', '!', '?', ')', ']', '}', '"', '\'', '`', '*', ':', '>'];

/// Structured quality score for one draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub hedging: f64,
    pub coherence: f64,
    pub completeness: f64,
    pub alignment: f64,
    /// 1.0 means clean. Present only when the toxicity check is enabled.
    pub toxicity: Option<f64>,
    /// Embedding cosine similarity, when semantic alignment ran.
    pub semantic_similarity: Option<f64>,
    /// Weighted aggregate in [0, 1].
    pub aggregate: f64,
}

impl QualityScore {
    /// Names of the components that fall below their configured floor.
    pub fn floor_violations(&self, floors: &ComponentFloors) -> Vec<&'static str> {
        let checks = [
            ("hedging", floors.hedging, Some(self.hedging)),
            ("coherence", floors.coherence, Some(self.coherence)),
            ("completeness", floors.completeness, Some(self.completeness)),
            ("alignment", floors.alignment, Some(self.alignment)),
            ("toxicity", floors.toxicity, self.toxicity),
        ];
        checks
            .into_iter()
            .filter_map(|(name, floor, value)| match (floor, value) {
                (Some(floor), Some(value)) if value < floor => Some(name),
                _ => None,
            })
            .collect()
    }

    fn reweigh(&mut self, weights: &QualityWeights) {
        self.aggregate = aggregate(
            weights,
            self.hedging,
            self.coherence,
            self.completeness,
            self.alignment,
            self.toxicity,
        );
    }
}

/// Multi-signal heuristic validator.
#[derive(Clone)]
pub struct QualityValidator {
    config: QualityConfig,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
}

impl std::fmt::Debug for QualityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityValidator")
            .field("config", &self.config)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl QualityValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            embedder: None,
        }
    }

    /// Attach an embedder for semantic alignment. Used only when
    /// `quality.semantic_alignment` is enabled.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Rule-based validation. Pure and deterministic.
    pub fn validate(&self, query: &str, draft: &str, domain: Domain) -> QualityScore {
        let toxicity = self.config.toxicity_check.then(|| toxicity_score(draft));

        if draft.trim().is_empty() {
            return QualityScore {
                hedging: 0.0,
                coherence: 0.0,
                completeness: 0.0,
                alignment: 0.0,
                toxicity,
                semantic_similarity: None,
                aggregate: 0.0,
            };
        }

        let mut score = QualityScore {
            hedging: hedging_score(draft),
            coherence: coherence_score(draft),
            completeness: completeness_score(query, draft),
            alignment: alignment_score(query, draft),
            toxicity,
            semantic_similarity: None,
            aggregate: 0.0,
        };
        score.reweigh(self.config.weights_for(domain));

        debug!(
            %domain,
            hedging = score.hedging,
            coherence = score.coherence,
            completeness = score.completeness,
            alignment = score.alignment,
            aggregate = score.aggregate,
            "draft validated"
        );
        score
    }

    /// Validation with optional embedding-based alignment. Falls back to the
    /// rule-based result when semantic alignment is off, no embedder is
    /// attached, or the embedder fails.
    pub async fn assess(&self, query: &str, draft: &str, domain: Domain) -> QualityScore {
        let mut score = self.validate(query, draft, domain);
        if !self.config.semantic_alignment || draft.trim().is_empty() {
            return score;
        }
        let Some(embedder) = &self.embedder else {
            return score;
        };

        let similarity = async {
            let q = embedder.embed(query).await?;
            let d = embedder.embed(draft).await?;
            Ok::<_, draftwise_core::DraftwiseError>(cosine_similarity(&q, &d))
        }
        .await;

        match similarity {
            Ok(similarity) => {
                score.semantic_similarity = Some(similarity);
                score.alignment = (score.alignment + similarity) / 2.0;
                score.reweigh(self.config.weights_for(domain));
            }
            Err(e) => {
                warn!(error = %e, "embedding alignment failed, using lexical alignment");
            }
        }
        score
    }
}

fn aggregate(
    weights: &QualityWeights,
    hedging: f64,
    coherence: f64,
    completeness: f64,
    alignment: f64,
    toxicity: Option<f64>,
) -> f64 {
    let mut parts = vec![
        (weights.hedging, hedging),
        (weights.coherence, coherence),
        (weights.completeness, completeness),
        (weights.alignment, alignment),
    ];
    if let Some(toxicity) = toxicity {
        parts.push((weights.toxicity, toxicity));
    }

    let total: f64 = parts.iter().map(|(w, _)| w).sum();
    let value = if total > 0.0 {
        parts.iter().map(|(w, s)| w * s).sum::<f64>() / total
    } else {
        parts.iter().map(|(_, s)| s).sum::<f64>() / parts.len() as f64
    };
    value.clamp(0.0, 1.0)
}

/// Inverse frequency of hedge phrases per sentence.
pub fn hedging_score(draft: &str) -> f64 {
    let words = tokens(draft);
    let hedges: usize = HEDGE_PHRASES
        .iter()
        .map(|phrase| count_phrase(&words, phrase))
        .sum();
    let sentence_count = sentences(draft).len().max(1) as f64;
    1.0 / (1.0 + 2.0 * hedges as f64 / sentence_count)
}

/// Structural coherence: sentence-length variance, repeated phrases and
/// abrupt truncation each subtract a bounded penalty.
pub fn coherence_score(draft: &str) -> f64 {
    let mut score: f64 = 1.0;

    // Sentence length variance (coefficient of variation).
    let lengths: Vec<f64> = sentences(draft)
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect();
    if lengths.len() >= 3 {
        let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
        let variance =
            lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
        let cv = variance.sqrt() / mean.max(1.0);
        if cv > 1.0 {
            score -= (0.2 * (cv - 1.0)).min(0.2);
        }
    }

    // Repeated word trigrams.
    let words = tokens(draft);
    if words.len() >= 6 {
        let trigrams: Vec<&[String]> = words.windows(3).collect();
        let unique: HashSet<&[String]> = trigrams.iter().copied().collect();
        let repeated = 1.0 - unique.len() as f64 / trigrams.len() as f64;
        score -= (repeated * 0.8).min(0.4);
    }

    // Abrupt truncation: unterminated final sentence or unclosed code fence.
    let unclosed_fence = draft.matches("```").count() % 2 == 1;
    let unterminated = draft
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| !TERMINAL_CHARS.contains(&c) && !c.is_ascii_digit());
    if unclosed_fence || (unterminated && words.len() > 3) {
        score -= 0.3;
    }

    score.clamp(0.0, 1.0)
}

/// Fraction of the query's key terms (and sub-questions) addressed by the draft.
pub fn completeness_score(query: &str, draft: &str) -> f64 {
    let terms = key_terms(query);
    if terms.is_empty() {
        return 1.0;
    }
    let vocabulary: HashSet<String> = tokens(draft).into_iter().collect();
    let covered = terms.iter().filter(|t| term_present(&vocabulary, t)).count();
    let term_coverage = covered as f64 / terms.len() as f64;

    let sub_questions: Vec<Vec<String>> = query
        .split('?')
        .map(key_terms)
        .filter(|terms| !terms.is_empty())
        .collect();
    if sub_questions.len() < 2 {
        return term_coverage;
    }
    let answered = sub_questions
        .iter()
        .filter(|terms| terms.iter().any(|t| term_present(&vocabulary, t)))
        .count();
    let question_coverage = answered as f64 / sub_questions.len() as f64;
    (term_coverage + question_coverage) / 2.0
}

/// Lexical topical overlap: shared vocabulary plus the share of draft
/// sentences that mention the query's topic at all.
pub fn alignment_score(query: &str, draft: &str) -> f64 {
    let query_terms = key_terms(query);
    if query_terms.is_empty() {
        return 1.0;
    }
    let draft_terms = key_terms(draft);
    if draft_terms.is_empty() {
        return 0.0;
    }

    let draft_vocab: HashSet<String> = draft_terms.iter().cloned().collect();
    let shared = query_terms
        .iter()
        .filter(|t| term_present(&draft_vocab, t))
        .count();
    let overlap = shared as f64 / query_terms.len().min(draft_terms.len()) as f64;

    let draft_sentences = sentences(draft);
    let on_topic = draft_sentences
        .iter()
        .filter(|s| {
            let vocab: HashSet<String> = tokens(s).into_iter().collect();
            query_terms.iter().any(|t| term_present(&vocab, t))
        })
        .count();
    let topical = on_topic as f64 / draft_sentences.len().max(1) as f64;

    ((overlap.min(1.0) + topical) / 2.0).clamp(0.0, 1.0)
}

/// Rule-based toxicity: 1.0 for clean text, decreasing per abusive term.
pub fn toxicity_score(draft: &str) -> f64 {
    let words = tokens(draft);
    let hits: usize = TOXIC_TERMS.iter().map(|t| count_phrase(&words, t)).sum();
    (1.0 - 0.5 * hits as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use draftwise_core::{AdapterType, DraftwiseError};

    use super::*;

    fn validator() -> QualityValidator {
        QualityValidator::new(QualityConfig::default())
    }

    #[test]
    fn confident_answer_scores_high() {
        let score = validator().validate(
            "What is 2+2?",
            "2 + 2 equals 4.",
            Domain::General,
        );
        assert_eq!(score.hedging, 1.0);
        assert_eq!(score.completeness, 1.0);
        assert!(score.aggregate > 0.9, "got {score:?}");
        assert_eq!(score.toxicity, Some(1.0));
    }

    #[test]
    fn hedging_lowers_score() {
        assert_eq!(hedging_score("Water boils at 100 degrees Celsius."), 1.0);
        let hedged = hedging_score("I'm not sure. Maybe it depends on altitude.");
        assert!(hedged < 0.5, "got {hedged}");
    }

    #[test]
    fn truncation_is_penalized() {
        let full = coherence_score("Rust uses ownership to manage memory safely.");
        let cut = coherence_score("Rust uses ownership to manage memory and the borrow");
        assert!(cut < full);
        assert!(coherence_score("Here:\n```rust\nfn main() {") < 1.0);
    }

    #[test]
    fn repetition_is_penalized() {
        let repeated = coherence_score(
            "The answer is yes. The answer is yes. The answer is yes. The answer is yes.",
        );
        assert!(repeated < 0.8, "got {repeated}");
    }

    #[test]
    fn completeness_counts_key_terms() {
        let query = "What are the early symptoms of diabetes?";
        let full = completeness_score(
            query,
            "Early symptoms of diabetes include thirst, fatigue and frequent urination.",
        );
        assert_eq!(full, 1.0);
        let partial = completeness_score(query, "Common symptoms include thirst and fatigue.");
        assert!((partial - 1.0 / 3.0).abs() < 1e-9, "got {partial}");
    }

    #[test]
    fn completeness_tracks_sub_questions() {
        let query = "What is Rust? Why is borrow checking useful?";
        let one = completeness_score(query, "Rust is a systems language.");
        let both = completeness_score(
            query,
            "Rust is a systems language. Borrow checking prevents data races, which is useful.",
        );
        assert!(both > one);
    }

    #[test]
    fn off_topic_draft_has_low_alignment() {
        let query = "How do I reverse a linked list in Rust?";
        let on = alignment_score(query, "To reverse a linked list in Rust, walk the list and flip each next pointer.");
        let off = alignment_score(query, "The weather today is sunny with mild winds.");
        assert!(on > 0.8, "got {on}");
        assert!(off < 0.2, "got {off}");
    }

    #[test]
    fn toxicity_detects_abuse() {
        assert_eq!(toxicity_score("Happy to help."), 1.0);
        assert!(toxicity_score("That is a stupid question, idiot.") <= 0.0);
    }

    #[test]
    fn toxicity_can_be_disabled() {
        let v = QualityValidator::new(QualityConfig {
            toxicity_check: false,
            ..QualityConfig::default()
        });
        assert_eq!(v.validate("q", "answer.", Domain::General).toxicity, None);
    }

    #[test]
    fn empty_draft_scores_zero() {
        let score = validator().validate("What is Rust?", "   ", Domain::General);
        assert_eq!(score.aggregate, 0.0);
    }

    #[test]
    fn domain_weights_change_aggregate() {
        let mut config = QualityConfig::default();
        config.domain_weights.insert(
            Domain::Medical,
            QualityWeights {
                hedging: 0.0,
                coherence: 0.0,
                completeness: 1.0,
                alignment: 0.0,
                toxicity: 0.0,
            },
        );
        let v = QualityValidator::new(config);
        let query = "What are the early symptoms of diabetes?";
        let draft = "Common symptoms include thirst and fatigue.";
        let medical = v.validate(query, draft, Domain::Medical);
        assert!((medical.aggregate - medical.completeness).abs() < 1e-9);
        let general = v.validate(query, draft, Domain::General);
        assert!(general.aggregate != medical.aggregate);
    }

    #[test]
    fn floor_violations_name_components() {
        let score = QualityScore {
            hedging: 0.9,
            coherence: 0.9,
            completeness: 0.6,
            alignment: 0.9,
            toxicity: Some(1.0),
            semantic_similarity: None,
            aggregate: 0.88,
        };
        let floors = ComponentFloors {
            completeness: Some(0.8),
            ..ComponentFloors::default()
        };
        assert_eq!(score.floor_violations(&floors), vec!["completeness"]);
        assert!(score.floor_violations(&ComponentFloors::default()).is_empty());
    }

    #[test]
    fn validation_is_deterministic() {
        let v = validator();
        let a = v.validate("Explain TCP handshakes", "TCP uses SYN, SYN-ACK, ACK.", Domain::Code);
        let b = v.validate("Explain TCP handshakes", "TCP uses SYN, SYN-ACK, ACK.", Domain::Code);
        assert_eq!(a, b);
    }

    struct ConstEmbedder(Option<Vec<f32>>);

    #[async_trait]
    impl PluginAdapter for ConstEmbedder {
        fn name(&self) -> &str {
            "const"
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }
    }

    #[async_trait]
    impl EmbeddingAdapter for ConstEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, DraftwiseError> {
            self.0
                .clone()
                .ok_or_else(|| DraftwiseError::Internal("embedder offline".into()))
        }
    }

    fn semantic_config() -> QualityConfig {
        QualityConfig {
            semantic_alignment: true,
            ..QualityConfig::default()
        }
    }

    #[tokio::test]
    async fn semantic_alignment_blends_similarity() {
        let v = QualityValidator::new(semantic_config())
            .with_embedder(Arc::new(ConstEmbedder(Some(vec![1.0, 0.0]))));
        let query = "How do I reverse a linked list in Rust?";
        let draft = "The weather today is sunny with mild winds.";
        let lexical = v.validate(query, draft, Domain::Code);
        let semantic = v.assess(query, draft, Domain::Code).await;
        assert_eq!(semantic.semantic_similarity, Some(1.0));
        assert!(semantic.alignment > lexical.alignment);
    }

    #[tokio::test]
    async fn embedder_failure_falls_back_to_lexical() {
        let v = QualityValidator::new(semantic_config())
            .with_embedder(Arc::new(ConstEmbedder(None)));
        let lexical = v.validate("What is Rust?", "Rust is a language.", Domain::General);
        let assessed = v.assess("What is Rust?", "Rust is a language.", Domain::General).await;
        assert_eq!(lexical, assessed);
    }

    #[tokio::test]
    async fn semantic_alignment_off_by_default() {
        let v = validator().with_embedder(Arc::new(ConstEmbedder(Some(vec![1.0]))));
        let assessed = v.assess("What is Rust?", "Rust is a language.", Domain::General).await;
        assert_eq!(assessed.semantic_similarity, None);
    }
}
