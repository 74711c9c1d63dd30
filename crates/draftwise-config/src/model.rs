// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Draftwise cascade engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use draftwise_core::{BudgetPeriod, ComplexityTier, Domain, ModelDescriptor};
use serde::{Deserialize, Serialize};

/// Top-level Draftwise configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DraftwiseConfig {
    /// Engine-wide settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Candidate model catalog.
    #[serde(default = "default_models")]
    pub models: Vec<ModelDescriptor>,

    /// Domain detection and cost estimation settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Threshold tables and escalation settings.
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// Quality validator weights and optional checks.
    #[serde(default)]
    pub quality: QualityConfig,

    /// Confidence estimator settings.
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Budget limits and enforcement policy.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Optional multi-step pipelines keyed by domain.
    #[serde(default)]
    pub pipelines: HashMap<Domain, PipelineConfig>,
}

impl Default for DraftwiseConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            models: default_models(),
            routing: RoutingConfig::default(),
            cascade: CascadeConfig::default(),
            quality: QualityConfig::default(),
            confidence: ConfidenceConfig::default(),
            budget: BudgetConfig::default(),
            pipelines: HashMap::new(),
        }
    }
}

impl DraftwiseConfig {
    /// Look up a model descriptor by name.
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }
}

fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            name: "gpt-4o-mini".to_string(),
            provider: "openai".to_string(),
            input_cost_per_1k: 0.000_15,
            output_cost_per_1k: 0.000_6,
            quality: 0.75,
            latency_ms: 600,
            domains: Vec::new(),
        },
        ModelDescriptor {
            name: "claude-haiku-4-5".to_string(),
            provider: "anthropic".to_string(),
            input_cost_per_1k: 0.001,
            output_cost_per_1k: 0.005,
            quality: 0.8,
            latency_ms: 700,
            domains: Vec::new(),
        },
        ModelDescriptor {
            name: "gpt-4o".to_string(),
            provider: "openai".to_string(),
            input_cost_per_1k: 0.002_5,
            output_cost_per_1k: 0.01,
            quality: 0.9,
            latency_ms: 1200,
            domains: Vec::new(),
        },
        ModelDescriptor {
            name: "claude-sonnet-4-5".to_string(),
            provider: "anthropic".to_string(),
            input_cost_per_1k: 0.003,
            output_cost_per_1k: 0.015,
            quality: 0.93,
            latency_ms: 1500,
            domains: Vec::new(),
        },
    ]
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deadline for a single provider call, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Cost ceiling for trivial queries. Trivial queries are restricted to
    /// candidates whose estimate fits this ceiling whenever any does.
    #[serde(default = "default_trivial_cost_ceiling_usd")]
    pub trivial_cost_ceiling_usd: Option<f64>,

    /// Plan applied to identities whose plan is not configured.
    #[serde(default = "default_plan")]
    pub default_plan: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            provider_timeout_ms: default_provider_timeout_ms(),
            trivial_cost_ceiling_usd: default_trivial_cost_ceiling_usd(),
            default_plan: default_plan(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

fn default_trivial_cost_ceiling_usd() -> Option<f64> {
    Some(0.001)
}

fn default_plan() -> String {
    "free".to_string()
}

/// Domain detection and token estimation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Consult the semantic domain classifier when rule confidence is low.
    /// Has no effect unless a classifier is attached to the engine.
    #[serde(default)]
    pub semantic_fallback: bool,

    /// Rule confidence below which the semantic classifier overrides.
    #[serde(default = "default_semantic_confidence_floor")]
    pub semantic_confidence_floor: f64,

    /// Conservative total-token estimate per complexity tier, used for
    /// affordability checks before a model is invoked.
    #[serde(default = "default_token_estimates")]
    pub token_estimates: HashMap<ComplexityTier, u32>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            semantic_fallback: false,
            semantic_confidence_floor: default_semantic_confidence_floor(),
            token_estimates: default_token_estimates(),
        }
    }
}

impl RoutingConfig {
    /// Token estimate for a tier, falling back to the largest configured estimate.
    pub fn token_estimate(&self, tier: ComplexityTier) -> u32 {
        self.token_estimates
            .get(&tier)
            .copied()
            .unwrap_or_else(|| self.token_estimates.values().copied().max().unwrap_or(4_000))
    }
}

fn default_semantic_confidence_floor() -> f64 {
    0.6
}

fn default_token_estimates() -> HashMap<ComplexityTier, u32> {
    HashMap::from([
        (ComplexityTier::Trivial, 300),
        (ComplexityTier::Simple, 800),
        (ComplexityTier::Moderate, 1_500),
        (ComplexityTier::Complex, 3_000),
        (ComplexityTier::Expert, 6_000),
    ])
}

/// Per-component minimum scores. Any violated floor forces escalation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentFloors {
    #[serde(default)]
    pub hedging: Option<f64>,
    #[serde(default)]
    pub coherence: Option<f64>,
    #[serde(default)]
    pub completeness: Option<f64>,
    #[serde(default)]
    pub alignment: Option<f64>,
    #[serde(default)]
    pub toxicity: Option<f64>,
}

/// Threshold tables and escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CascadeConfig {
    /// Threshold used when neither a domain nor a tier entry exists.
    #[serde(default = "default_global_threshold")]
    pub global_threshold: f64,

    /// Default thresholds per complexity tier.
    #[serde(default = "default_tier_thresholds")]
    pub tier_thresholds: HashMap<ComplexityTier, f64>,

    /// Domain-specific thresholds. Take precedence over tier defaults.
    #[serde(default = "default_domain_thresholds")]
    pub domain_thresholds: HashMap<Domain, f64>,

    /// Domain-specific component floors, checked before the threshold.
    #[serde(default = "default_domain_floors")]
    pub domain_floors: HashMap<Domain, ComponentFloors>,

    /// Verifier model. `None` picks the highest-quality candidate.
    #[serde(default)]
    pub verifier_model: Option<String>,

    /// Domain-specific verifier overrides.
    #[serde(default)]
    pub domain_verifiers: HashMap<Domain, String>,

    /// Retries of the same model after a provider failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            global_threshold: default_global_threshold(),
            tier_thresholds: default_tier_thresholds(),
            domain_thresholds: default_domain_thresholds(),
            domain_floors: default_domain_floors(),
            verifier_model: None,
            domain_verifiers: HashMap::new(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_global_threshold() -> f64 {
    0.7
}

fn default_tier_thresholds() -> HashMap<ComplexityTier, f64> {
    HashMap::from([
        (ComplexityTier::Trivial, 0.55),
        (ComplexityTier::Simple, 0.6),
        (ComplexityTier::Moderate, 0.7),
        (ComplexityTier::Complex, 0.75),
        (ComplexityTier::Expert, 0.8),
    ])
}

fn default_domain_thresholds() -> HashMap<Domain, f64> {
    HashMap::from([
        (Domain::Medical, 0.85),
        (Domain::Legal, 0.8),
        (Domain::Financial, 0.8),
    ])
}

fn default_domain_floors() -> HashMap<Domain, ComponentFloors> {
    HashMap::from([(
        Domain::Medical,
        ComponentFloors {
            completeness: Some(0.8),
            ..ComponentFloors::default()
        },
    )])
}

fn default_max_retries() -> u32 {
    1
}

/// Relative weights of the quality components in the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QualityWeights {
    #[serde(default = "default_hedging_weight")]
    pub hedging: f64,
    #[serde(default = "default_coherence_weight")]
    pub coherence: f64,
    #[serde(default = "default_completeness_weight")]
    pub completeness: f64,
    #[serde(default = "default_alignment_weight")]
    pub alignment: f64,
    #[serde(default)]
    pub toxicity: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            hedging: default_hedging_weight(),
            coherence: default_coherence_weight(),
            completeness: default_completeness_weight(),
            alignment: default_alignment_weight(),
            toxicity: 0.0,
        }
    }
}

impl QualityWeights {
    pub fn sum(&self) -> f64 {
        self.hedging + self.coherence + self.completeness + self.alignment + self.toxicity
    }
}

fn default_hedging_weight() -> f64 {
    0.2
}

fn default_coherence_weight() -> f64 {
    0.25
}

fn default_completeness_weight() -> f64 {
    0.3
}

fn default_alignment_weight() -> f64 {
    0.25
}

/// Quality validator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// Default component weights.
    #[serde(default)]
    pub weights: QualityWeights,

    /// Domain-specific component weights.
    #[serde(default)]
    pub domain_weights: HashMap<Domain, QualityWeights>,

    /// Report a rule-based toxicity component.
    #[serde(default = "default_toxicity_check")]
    pub toxicity_check: bool,

    /// Blend embedding similarity into alignment when an embedder is attached.
    #[serde(default)]
    pub semantic_alignment: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            domain_weights: HashMap::new(),
            toxicity_check: default_toxicity_check(),
            semantic_alignment: false,
        }
    }
}

impl QualityConfig {
    /// Weights for a domain, falling back to the defaults.
    pub fn weights_for(&self, domain: Domain) -> &QualityWeights {
        self.domain_weights.get(&domain).unwrap_or(&self.weights)
    }
}

fn default_toxicity_check() -> bool {
    true
}

/// Confidence estimator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceConfig {
    /// Weight of the model's static quality prior (0.0-1.0).
    #[serde(default = "default_prior_weight")]
    pub prior_weight: f64,

    /// Amount subtracted from confidence per complexity tier.
    #[serde(default = "default_tier_discounts")]
    pub tier_discounts: HashMap<ComplexityTier, f64>,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            prior_weight: default_prior_weight(),
            tier_discounts: default_tier_discounts(),
        }
    }
}

fn default_prior_weight() -> f64 {
    0.2
}

fn default_tier_discounts() -> HashMap<ComplexityTier, f64> {
    HashMap::from([
        (ComplexityTier::Trivial, 0.0),
        (ComplexityTier::Simple, 0.02),
        (ComplexityTier::Moderate, 0.05),
        (ComplexityTier::Complex, 0.1),
        (ComplexityTier::Expert, 0.15),
    ])
}

/// How budget actions are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Block actions deny the request.
    #[default]
    Strict,
    /// Block actions are logged and downgraded to warn.
    Soft,
    /// Every request is allowed. Spend is still tracked.
    Disabled,
}

/// Candidate ordering for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    #[default]
    CheapestFirst,
    QualityFirst,
}

/// Spending limits per budget window, in USD. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetLimits {
    #[serde(default)]
    pub daily_usd: Option<f64>,
    #[serde(default)]
    pub weekly_usd: Option<f64>,
    #[serde(default)]
    pub monthly_usd: Option<f64>,
    #[serde(default)]
    pub total_usd: Option<f64>,
}

impl BudgetLimits {
    pub fn limit(&self, period: BudgetPeriod) -> Option<f64> {
        match period {
            BudgetPeriod::Daily => self.daily_usd,
            BudgetPeriod::Weekly => self.weekly_usd,
            BudgetPeriod::Monthly => self.monthly_usd,
            BudgetPeriod::Total => self.total_usd,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.daily_usd.is_none()
            && self.weekly_usd.is_none()
            && self.monthly_usd.is_none()
            && self.total_usd.is_none()
    }
}

/// An identity service plan.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    #[serde(default)]
    pub daily_usd: Option<f64>,
    #[serde(default)]
    pub weekly_usd: Option<f64>,
    #[serde(default)]
    pub monthly_usd: Option<f64>,
    #[serde(default)]
    pub total_usd: Option<f64>,

    /// Models this plan may use. Empty allows the whole catalog.
    #[serde(default)]
    pub allowed_models: Vec<String>,

    /// Candidate ordering for this plan.
    #[serde(default)]
    pub selection: SelectionOrder,
}

impl PlanConfig {
    pub fn limits(&self) -> BudgetLimits {
        BudgetLimits {
            daily_usd: self.daily_usd,
            weekly_usd: self.weekly_usd,
            monthly_usd: self.monthly_usd,
            total_usd: self.total_usd,
        }
    }

    pub fn allows(&self, model: &str) -> bool {
        self.allowed_models.is_empty() || self.allowed_models.iter().any(|m| m == model)
    }
}

/// Budget enforcement configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Fraction of a limit at which a warning is raised.
    #[serde(default = "default_warn_at")]
    pub warn_at: f64,

    /// Fraction of a limit at which requests are degraded to cheaper models.
    #[serde(default = "default_degrade_at")]
    pub degrade_at: f64,

    /// Fraction of a limit beyond which requests are blocked.
    #[serde(default = "default_block_at")]
    pub block_at: f64,

    /// How block actions are applied.
    #[serde(default)]
    pub enforcement: EnforcementMode,

    /// Fraction of the remaining budget used as the selection ceiling on degrade.
    #[serde(default = "default_degrade_ceiling_fraction")]
    pub degrade_ceiling_fraction: f64,

    /// Limits across all identities.
    #[serde(default)]
    pub global: BudgetLimits,

    /// Plans keyed by name.
    #[serde(default = "default_plans")]
    pub plans: HashMap<String, PlanConfig>,

    /// Identity-specific limits overriding the plan limits.
    #[serde(default)]
    pub identities: HashMap<String, BudgetLimits>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            warn_at: default_warn_at(),
            degrade_at: default_degrade_at(),
            block_at: default_block_at(),
            enforcement: EnforcementMode::default(),
            degrade_ceiling_fraction: default_degrade_ceiling_fraction(),
            global: BudgetLimits::default(),
            plans: default_plans(),
            identities: HashMap::new(),
        }
    }
}

fn default_warn_at() -> f64 {
    0.8
}

fn default_degrade_at() -> f64 {
    0.9
}

fn default_block_at() -> f64 {
    1.0
}

fn default_degrade_ceiling_fraction() -> f64 {
    0.5
}

fn default_plans() -> HashMap<String, PlanConfig> {
    HashMap::from([
        (
            "free".to_string(),
            PlanConfig {
                daily_usd: Some(0.5),
                monthly_usd: Some(5.0),
                ..PlanConfig::default()
            },
        ),
        (
            "pro".to_string(),
            PlanConfig {
                daily_usd: Some(10.0),
                monthly_usd: Some(200.0),
                ..PlanConfig::default()
            },
        ),
    ])
}

/// A multi-step pipeline for one domain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub steps: Vec<PipelineStepConfig>,
}

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineStepConfig {
    /// Step label used in traces.
    pub name: String,

    /// Primary model for the step.
    pub model: String,

    /// Model tried once when the primary fails validation.
    #[serde(default)]
    pub fallback_model: Option<String>,

    /// Minimum confidence for the step to pass. `None` uses the resolved
    /// cascade threshold for the query.
    #[serde(default)]
    pub min_confidence: Option<f64>,

    /// Retries of the primary model after a provider failure.
    #[serde(default)]
    pub retry_budget: u32,
}
