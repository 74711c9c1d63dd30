// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity analysis.
//!
//! Scores a query into an ordered [`ComplexityTier`] using zero-cost rules:
//! word-count bands, reasoning markers, domain-specific complexity keywords
//! and structural cues. Every signal only ever adds to the score, so adding
//! signal keywords to a query can never lower its tier.

use draftwise_core::{ComplexityTier, Domain};
use tracing::debug;

use crate::domain::{contains_term, normalize};

/// Reasoning and connector markers, +1 each (distinct).
const REASONING_MARKERS: &[&str] = &[
    "therefore", "analyze", "analyse", "optimize", "compare", "evaluate", "explain why",
    "step by step", "trade-off", "tradeoff", "pros and cons", "justify", "derive",
    "implement", "design", "in depth", "comprehensive", "consequently", "implications",
    "critique",
];

/// Domain-specific complexity keywords, +2 each (distinct).
const DOMAIN_COMPLEXITY: &[(Domain, &[&str])] = &[
    (
        Domain::Code,
        &[
            "concurrent", "concurrency", "architecture", "distributed", "lock-free",
            "race condition", "deadlock", "scalable", "microservices", "memory safety",
        ],
    ),
    (
        Domain::Data,
        &["partitioning", "streaming", "schema migration", "sharding", "window function"],
    ),
    (
        Domain::Math,
        &["proof", "theorem", "eigenvalue", "differential equation", "topology", "lemma"],
    ),
    (
        Domain::Medical,
        &[
            "differential diagnosis", "contraindication", "drug interaction", "comorbidity",
            "pharmacokinetics", "prognosis",
        ],
    ),
    (
        Domain::Legal,
        &["precedent", "jurisdiction", "liability", "indemnification", "statutory"],
    ),
    (
        Domain::Financial,
        &["derivatives", "arbitrage", "valuation", "risk-adjusted", "hedging"],
    ),
    (
        Domain::Science,
        &["quantum", "thermodynamics", "mechanism", "peer-reviewed", "entropy"],
    ),
    (Domain::Creative, &["narrative arc", "worldbuilding", "iambic", "allegory"]),
];

/// Breakdown of a complexity score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexityAnalysis {
    /// The resolved tier.
    pub tier: ComplexityTier,
    /// Raw additive score.
    pub score: u32,
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Matched reasoning markers and domain keywords.
    pub signals: Vec<&'static str>,
}

/// Heuristic complexity analyzer with zero cost and zero latency.
#[derive(Debug, Clone, Default)]
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the tier of `text` under `domain`.
    pub fn analyze(&self, text: &str, domain: Domain) -> ComplexityTier {
        self.score(text, domain).tier
    }

    /// Score `text` and report the contributing signals.
    pub fn score(&self, text: &str, domain: Domain) -> ComplexityAnalysis {
        let trimmed = text.trim();
        let normalized = normalize(trimmed);
        let word_count = trimmed.split_whitespace().count();
        let mut signals = Vec::new();

        // Signal 1: length band
        let mut score = Self::length_score(word_count);

        // Signal 2: reasoning markers
        for marker in REASONING_MARKERS {
            if contains_term(&normalized, marker) {
                score += 1;
                signals.push(*marker);
            }
        }

        // Signal 3: domain complexity keywords
        if let Some((_, keywords)) = DOMAIN_COMPLEXITY.iter().find(|(d, _)| *d == domain) {
            for keyword in keywords.iter() {
                if contains_term(&normalized, keyword) {
                    score += 2;
                    signals.push(*keyword);
                }
            }
        }

        // Signal 4: code blocks
        if trimmed.contains("```") {
            score += 2;
        }

        // Signal 5: multiple sub-questions
        if trimmed.matches('?').count() >= 2 {
            score += 1;
        }

        let tier = Self::score_to_tier(score);
        debug!(%domain, %tier, score, word_count, "complexity analyzed");

        ComplexityAnalysis {
            tier,
            score,
            word_count,
            signals,
        }
    }

    fn length_score(word_count: usize) -> u32 {
        match word_count {
            0..=5 => 0,
            6..=15 => 1,
            16..=40 => 2,
            41..=100 => 3,
            _ => 4,
        }
    }

    fn score_to_tier(score: u32) -> ComplexityTier {
        match score {
            0 => ComplexityTier::Trivial,
            1 => ComplexityTier::Simple,
            2..=3 => ComplexityTier::Moderate,
            4..=6 => ComplexityTier::Complex,
            _ => ComplexityTier::Expert,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn arithmetic_is_trivial() {
        let a = ComplexityAnalyzer::new();
        assert_eq!(a.analyze("What is 2+2?", Domain::General), ComplexityTier::Trivial);
    }

    #[test]
    fn empty_is_trivial() {
        let a = ComplexityAnalyzer::new();
        assert_eq!(a.analyze("", Domain::General), ComplexityTier::Trivial);
        assert_eq!(a.analyze("   ", Domain::Code), ComplexityTier::Trivial);
    }

    #[test]
    fn short_factual_question_is_simple() {
        let a = ComplexityAnalyzer::new();
        assert_eq!(
            a.analyze("What are the early symptoms of diabetes?", Domain::Medical),
            ComplexityTier::Simple
        );
    }

    #[test]
    fn reasoning_markers_raise_tier() {
        let a = ComplexityAnalyzer::new();
        let analysis = a.score(
            "Compare these two sorting approaches and explain why one is faster",
            Domain::General,
        );
        assert_eq!(analysis.tier, ComplexityTier::Moderate);
        assert!(analysis.signals.contains(&"compare"));
        assert!(analysis.signals.contains(&"explain why"));
    }

    #[test]
    fn domain_keywords_only_count_for_their_domain() {
        let a = ComplexityAnalyzer::new();
        let text = "Is this architecture concurrent?";
        assert_eq!(a.score(text, Domain::Code).score, 4);
        assert_eq!(a.score(text, Domain::General).score, 0);
    }

    #[test]
    fn code_design_question_is_expert() {
        let a = ComplexityAnalyzer::new();
        let tier = a.analyze(
            "Design a lock-free concurrent queue architecture in Rust and analyze \
             the trade-off against a mutex-based design",
            Domain::Code,
        );
        assert_eq!(tier, ComplexityTier::Expert);
    }

    #[test]
    fn code_fence_adds_weight() {
        let a = ComplexityAnalyzer::new();
        let plain = a.score("can you fix this?", Domain::Code).score;
        let fenced = a
            .score("can you fix this?\n```\nfn main() { panic!() }\n```", Domain::Code)
            .score;
        assert!(fenced >= plain + 2);
    }

    #[test]
    fn length_bands() {
        assert_eq!(ComplexityAnalyzer::length_score(3), 0);
        assert_eq!(ComplexityAnalyzer::length_score(10), 1);
        assert_eq!(ComplexityAnalyzer::length_score(30), 2);
        assert_eq!(ComplexityAnalyzer::length_score(80), 3);
        assert_eq!(ComplexityAnalyzer::length_score(500), 4);
    }

    const SIGNAL_WORDS: &[&str] = &[
        "therefore", "analyze", "optimize", "compare", "concurrent", "architecture",
        "distributed", "deadlock", "step by step", "```",
    ];

    proptest! {
        #[test]
        fn adding_signals_never_lowers_tier(
            base in "[a-z ]{0,80}",
            picks in proptest::collection::vec(0usize..SIGNAL_WORDS.len(), 1..6),
            domain_idx in 0usize..3,
        ) {
            let domain = [Domain::General, Domain::Code, Domain::Math][domain_idx];
            let a = ComplexityAnalyzer::new();
            let before = a.analyze(&base, domain);
            let mut extended = base.clone();
            for i in picks {
                extended.push(' ');
                extended.push_str(SIGNAL_WORDS[i]);
            }
            let after = a.analyze(&extended, domain);
            prop_assert!(after >= before, "{before} -> {after} for {extended:?}");
        }
    }
}
