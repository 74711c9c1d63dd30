// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-step domain pipelines.
//!
//! A [`PipelineStrategy`] is immutable configuration: an ordered list of
//! [`CascadeStep`]s, each naming a model, a validation function, an optional
//! fallback model and a retry budget. Executing it produces a per-run trace
//! and nothing else.

use std::sync::Arc;

use draftwise_config::model::{PipelineConfig, PipelineStepConfig};
use draftwise_core::{ComplexityTier, Domain};
use draftwise_quality::QualityScore;

/// What a step validator sees about a step's output.
#[derive(Debug, Clone, Copy)]
pub struct StepEvaluation<'a> {
    pub domain: Domain,
    pub complexity: ComplexityTier,
    pub text: &'a str,
    pub quality: &'a QualityScore,
    pub confidence: f64,
    /// Acceptance threshold resolved for the query.
    pub threshold: f64,
    /// Quality components below their domain floor.
    pub floor_violations: &'a [&'static str],
}

/// Decides whether a step's output is good enough to stop the pipeline.
pub trait StepValidator: Send + Sync {
    fn passes(&self, evaluation: &StepEvaluation<'_>) -> bool;
}

impl<F> StepValidator for F
where
    F: Fn(&StepEvaluation<'_>) -> bool + Send + Sync,
{
    fn passes(&self, evaluation: &StepEvaluation<'_>) -> bool {
        self(evaluation)
    }
}

/// Passes when confidence reaches a fixed minimum (or the resolved threshold
/// when none is set) and no domain floor is violated.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinConfidence(pub Option<f64>);

impl StepValidator for MinConfidence {
    fn passes(&self, evaluation: &StepEvaluation<'_>) -> bool {
        let minimum = self.0.unwrap_or(evaluation.threshold);
        evaluation.floor_violations.is_empty() && evaluation.confidence >= minimum
    }
}

/// One step of a pipeline.
#[derive(Clone)]
pub struct CascadeStep {
    pub name: String,
    pub model: String,
    pub fallback_model: Option<String>,
    pub validator: Arc<dyn StepValidator>,
    /// Retries of the primary model after a provider failure.
    pub retry_budget: u32,
}

impl CascadeStep {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            fallback_model: None,
            validator: Arc::new(MinConfidence(None)),
            retry_budget: 0,
        }
    }

    pub fn with_fallback(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    pub fn with_validator(mut self, validator: impl StepValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_retry_budget(mut self, retries: u32) -> Self {
        self.retry_budget = retries;
        self
    }

    fn from_config(config: &PipelineStepConfig) -> Self {
        Self {
            name: config.name.clone(),
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            validator: Arc::new(MinConfidence(config.min_confidence)),
            retry_budget: config.retry_budget,
        }
    }

    /// Models this step may invoke, primary first.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.model.as_str()).chain(self.fallback_model.as_deref())
    }
}

impl std::fmt::Debug for CascadeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeStep")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("retry_budget", &self.retry_budget)
            .finish_non_exhaustive()
    }
}

/// Ordered steps run in place of the flat draft/verify cascade for one domain.
#[derive(Debug, Clone)]
pub struct PipelineStrategy {
    pub domain: Domain,
    pub steps: Vec<CascadeStep>,
}

impl PipelineStrategy {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: CascadeStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn from_config(domain: Domain, config: &PipelineConfig) -> Self {
        Self {
            domain,
            steps: config.steps.iter().map(CascadeStep::from_config).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(aggregate: f64) -> QualityScore {
        QualityScore {
            hedging: aggregate,
            coherence: aggregate,
            completeness: aggregate,
            alignment: aggregate,
            toxicity: None,
            semantic_similarity: None,
            aggregate,
        }
    }

    fn evaluation<'a>(
        quality: &'a QualityScore,
        confidence: f64,
        violations: &'a [&'static str],
    ) -> StepEvaluation<'a> {
        StepEvaluation {
            domain: Domain::Medical,
            complexity: ComplexityTier::Simple,
            text: "answer",
            quality,
            confidence,
            threshold: 0.8,
            floor_violations: violations,
        }
    }

    #[test]
    fn min_confidence_defaults_to_resolved_threshold() {
        let q = quality(0.9);
        assert!(MinConfidence(None).passes(&evaluation(&q, 0.8, &[])));
        assert!(!MinConfidence(None).passes(&evaluation(&q, 0.79, &[])));
        assert!(MinConfidence(Some(0.5)).passes(&evaluation(&q, 0.6, &[])));
        assert!(!MinConfidence(Some(0.5)).passes(&evaluation(&q, 0.9, &["completeness"])));
    }

    fn cites_icd(e: &StepEvaluation<'_>) -> bool {
        e.text.contains("ICD")
    }

    #[test]
    fn functions_are_validators() {
        let step = CascadeStep::new("triage", "gpt-4o-mini").with_validator(cites_icd);
        let q = quality(1.0);
        assert!(!step.validator.passes(&evaluation(&q, 1.0, &[])));
    }

    #[test]
    fn from_config_keeps_step_order() {
        let config = PipelineConfig {
            steps: vec![
                PipelineStepConfig {
                    name: "triage".into(),
                    model: "gpt-4o-mini".into(),
                    fallback_model: Some("claude-haiku-4-5".into()),
                    min_confidence: Some(0.6),
                    retry_budget: 2,
                },
                PipelineStepConfig {
                    name: "review".into(),
                    model: "gpt-4o".into(),
                    fallback_model: None,
                    min_confidence: None,
                    retry_budget: 0,
                },
            ],
        };
        let strategy = PipelineStrategy::from_config(Domain::Medical, &config);
        assert_eq!(strategy.steps.len(), 2);
        assert_eq!(strategy.steps[0].retry_budget, 2);
        assert_eq!(
            strategy.steps[0].models().collect::<Vec<_>>(),
            vec!["gpt-4o-mini", "claude-haiku-4-5"]
        );
        assert_eq!(strategy.steps[1].name, "review");
    }
}
