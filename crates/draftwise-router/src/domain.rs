// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based domain detection with an optional semantic fallback.
//!
//! The rule path counts distinct matching signals per domain: keywords from
//! per-domain term lists plus structural cues (code fences, citation
//! patterns). The domain with the strict maximum wins. Ties and zero matches
//! resolve to [`Domain::General`] with confidence 0.5.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use draftwise_core::{Domain, DomainClassifierAdapter, DraftwiseError, EmbeddingAdapter};
use draftwise_core::traits::embedding::cosine_similarity;
use regex::Regex;
use tracing::{debug, warn};

/// Confidence returned for ties, empty input and unrecognized queries.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Upper bound on rule-based confidence.
const MAX_RULE_CONFIDENCE: f64 = 0.95;

const CODE_TERMS: &[&str] = &[
    "code", "function", "compile", "compiler", "bug", "debug", "refactor", "python",
    "rust", "javascript", "typescript", "java", "golang", "api", "variable", "class",
    "method", "runtime", "stack trace", "exception", "library", "async", "thread",
    "struct", "git", "sql query", "unit test",
];

const DATA_TERMS: &[&str] = &[
    "dataset", "dataframe", "csv", "etl", "pipeline", "schema", "warehouse",
    "pandas", "spark", "aggregate", "pivot", "data cleaning", "columns", "rows",
    "visualization", "dashboard",
];

const MATH_TERMS: &[&str] = &[
    "equation", "integral", "derivative", "theorem", "prove", "proof", "matrix",
    "eigenvalue", "probability", "polynomial", "calculus", "algebra", "geometry",
    "logarithm", "factorial", "prime", "vector space",
];

const MEDICAL_TERMS: &[&str] = &[
    "symptom", "diagnosis", "diagnose", "treatment", "disease", "diabetes", "cancer",
    "patient", "dosage", "dose", "medication", "prescription", "clinical",
    "therapy", "infection", "chronic", "side effect", "blood pressure", "doctor",
    "hospital", "vaccine",
];

const LEGAL_TERMS: &[&str] = &[
    "contract", "lawsuit", "liability", "statute", "plaintiff", "defendant",
    "attorney", "lawyer", "court", "legal", "copyright", "trademark", "patent",
    "tort", "jurisdiction", "clause", "indemnify", "gdpr", "compliance",
];

const FINANCIAL_TERMS: &[&str] = &[
    "investment", "invest", "stock", "bond", "portfolio", "dividend", "interest rate",
    "mortgage", "loan", "tax", "revenue", "profit", "inflation", "retirement",
    "etf", "hedge", "valuation", "cash flow", "balance sheet",
];

const SCIENCE_TERMS: &[&str] = &[
    "physics", "chemistry", "biology", "molecule", "atom", "quantum", "experiment",
    "hypothesis", "evolution", "photosynthesis", "gravity", "particle", "genome",
    "climate", "ecosystem", "thermodynamics",
];

const CREATIVE_TERMS: &[&str] = &[
    "poem", "story", "novel", "lyrics", "song", "fiction", "character", "plot",
    "haiku", "screenplay", "metaphor", "creative", "rhyme", "narrative",
];

/// Per-domain keyword lists.
static DOMAIN_TERMS: &[(Domain, &[&str])] = &[
    (Domain::Code, CODE_TERMS),
    (Domain::Data, DATA_TERMS),
    (Domain::Math, MATH_TERMS),
    (Domain::Medical, MEDICAL_TERMS),
    (Domain::Legal, LEGAL_TERMS),
    (Domain::Financial, FINANCIAL_TERMS),
    (Domain::Science, SCIENCE_TERMS),
    (Domain::Creative, CREATIVE_TERMS),
];

/// Structural cues, each counted as one signal for its domain.
static STRUCTURAL_PATTERNS: LazyLock<Vec<(Domain, Regex)>> = LazyLock::new(|| {
    [
        // Fenced code blocks
        (Domain::Code, r"```"),
        // Call or definition syntax: foo(), fn main, def foo
        (Domain::Code, r"\b(fn|def|func|impl|let|const)\s+\w+|\w+\(\)"),
        // Case citations: Smith v. Jones
        (Domain::Legal, r"\b[A-Z][a-z]+ v\. [A-Z][a-z]+"),
        // Statute citations: 17 U.S.C. § 107, § 230
        (Domain::Legal, r"§\s*\d+|\bU\.S\.C\.|\bC\.F\.R\."),
        // Academic citations: et al., doi:10.x
        (Domain::Science, r"\bet al\.|\bdoi:\s*10\.\d+"),
        // Currency amounts
        (Domain::Financial, r"[$€£]\s?\d"),
        // Dosage units
        (Domain::Medical, r"\b\d+\s?(mg|mcg|ml)\b"),
    ]
    .into_iter()
    .filter_map(|(domain, pattern)| Regex::new(pattern).ok().map(|re| (domain, re)))
    .collect()
});

/// Outcome of domain detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainDetection {
    pub domain: Domain,
    pub confidence: f64,
}

impl DomainDetection {
    /// The result for ties, zero matches and empty input.
    pub fn general() -> Self {
        Self {
            domain: Domain::General,
            confidence: NEUTRAL_CONFIDENCE,
        }
    }
}

/// Deterministic keyword and pattern domain detector. Never fails.
#[derive(Debug, Clone, Default)]
pub struct DomainDetector;

impl DomainDetector {
    pub fn new() -> Self {
        Self
    }

    /// Count distinct matching signals per domain.
    pub fn signal_counts(&self, text: &str) -> HashMap<Domain, usize> {
        let normalized = normalize(text);
        let mut counts = HashMap::new();

        for (domain, terms) in DOMAIN_TERMS {
            let hits = terms
                .iter()
                .filter(|term| contains_term(&normalized, term))
                .count();
            if hits > 0 {
                *counts.entry(*domain).or_insert(0) += hits;
            }
        }

        for (domain, pattern) in STRUCTURAL_PATTERNS.iter() {
            if pattern.is_match(text) {
                *counts.entry(*domain).or_insert(0) += 1;
            }
        }

        counts
    }

    /// Classify `text` into a domain with a confidence in [0.5, 0.95].
    pub fn detect(&self, text: &str) -> DomainDetection {
        if text.trim().is_empty() {
            return DomainDetection::general();
        }

        let counts = self.signal_counts(text);
        let mut ranked: Vec<(Domain, usize)> = counts.into_iter().collect();
        // Sort by count desc, then domain for a stable order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let detection = match ranked.as_slice() {
            [] => DomainDetection::general(),
            [(_, best), (_, second), ..] if best == second => DomainDetection::general(),
            [(domain, best), rest @ ..] => {
                let second = rest.first().map(|(_, c)| *c).unwrap_or(0);
                let margin = (best - second) as f64;
                DomainDetection {
                    domain: *domain,
                    confidence: (NEUTRAL_CONFIDENCE + 0.1 * *best as f64 + 0.05 * margin)
                        .min(MAX_RULE_CONFIDENCE),
                }
            }
        };

        debug!(
            domain = %detection.domain,
            confidence = detection.confidence,
            "domain detected"
        );
        detection
    }
}

/// Lowercase, strip punctuation (keeping intra-word `-`), and pad with spaces
/// so phrase lookups can match on word boundaries.
pub(crate) fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

/// Whole-word (or whole-phrase) match, tolerating a plural `s`.
pub(crate) fn contains_term(normalized: &str, term: &str) -> bool {
    normalized.contains(&format!(" {term} ")) || normalized.contains(&format!(" {term}s "))
}

/// Rule detector plus an optional semantic classifier consulted when the
/// rule confidence falls below a floor.
#[derive(Clone)]
pub struct SemanticDomainDetector {
    rules: DomainDetector,
    classifier: Option<Arc<dyn DomainClassifierAdapter>>,
    confidence_floor: f64,
}

impl SemanticDomainDetector {
    /// Rule-only detection.
    pub fn rules_only() -> Self {
        Self {
            rules: DomainDetector::new(),
            classifier: None,
            confidence_floor: 0.0,
        }
    }

    pub fn with_classifier(
        classifier: Arc<dyn DomainClassifierAdapter>,
        confidence_floor: f64,
    ) -> Self {
        Self {
            rules: DomainDetector::new(),
            classifier: Some(classifier),
            confidence_floor,
        }
    }

    /// Whether a semantic classifier is attached.
    pub fn is_semantic(&self) -> bool {
        self.classifier.is_some()
    }

    /// Detect with rules, overriding with the classifier when rule
    /// confidence is below the floor. Classifier errors keep the rule result.
    pub async fn detect(&self, text: &str) -> DomainDetection {
        let rule = self.rules.detect(text);
        let Some(classifier) = &self.classifier else {
            return rule;
        };
        if rule.confidence >= self.confidence_floor || text.trim().is_empty() {
            return rule;
        }

        match classifier.classify(text).await {
            Ok((domain, confidence)) => {
                debug!(
                    rule_domain = %rule.domain,
                    %domain,
                    confidence,
                    "semantic domain override"
                );
                DomainDetection {
                    domain,
                    confidence: confidence.clamp(0.0, 1.0),
                }
            }
            Err(e) => {
                warn!(error = %e, "semantic domain classifier failed, keeping rule result");
                rule
            }
        }
    }
}

impl std::fmt::Debug for SemanticDomainDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticDomainDetector")
            .field("semantic", &self.classifier.is_some())
            .field("confidence_floor", &self.confidence_floor)
            .finish()
    }
}

/// Domain classifier backed by embedding similarity against exemplar utterances.
pub struct ExemplarDomainClassifier {
    embedder: Arc<dyn EmbeddingAdapter>,
    exemplars: Vec<(Domain, String)>,
}

impl ExemplarDomainClassifier {
    pub fn new(embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        Self {
            embedder,
            exemplars: default_exemplars(),
        }
    }

    /// Replace the exemplar set.
    pub fn with_exemplars(mut self, exemplars: Vec<(Domain, String)>) -> Self {
        self.exemplars = exemplars;
        self
    }
}

fn default_exemplars() -> Vec<(Domain, String)> {
    [
        (Domain::Code, "How do I fix this error in my program?"),
        (Domain::Data, "How should I clean and transform this table of records?"),
        (Domain::Math, "Solve for x and show the working."),
        (Domain::Medical, "What could be causing my headaches and fatigue?"),
        (Domain::Legal, "Can my landlord keep my deposit under the lease?"),
        (Domain::Financial, "Should I pay off debt or save for retirement first?"),
        (Domain::Science, "Why does ice float on water?"),
        (Domain::Creative, "Write a short story about a lighthouse keeper."),
        (Domain::General, "What's a good way to spend a rainy afternoon?"),
    ]
    .into_iter()
    .map(|(d, s)| (d, s.to_string()))
    .collect()
}

#[async_trait::async_trait]
impl draftwise_core::PluginAdapter for ExemplarDomainClassifier {
    fn name(&self) -> &str {
        "exemplar-domain-classifier"
    }

    fn adapter_type(&self) -> draftwise_core::AdapterType {
        draftwise_core::AdapterType::DomainClassifier
    }
}

#[async_trait::async_trait]
impl DomainClassifierAdapter for ExemplarDomainClassifier {
    async fn classify(&self, text: &str) -> Result<(Domain, f64), DraftwiseError> {
        let query = self.embedder.embed(text).await?;
        let mut best = (Domain::General, 0.0_f64);
        for (domain, exemplar) in &self.exemplars {
            let vector = self.embedder.embed(exemplar).await?;
            let similarity = cosine_similarity(&query, &vector);
            if similarity > best.1 {
                best = (*domain, similarity);
            }
        }
        Ok(best)
    }
}
