// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared data model used across the Draftwise crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Coarse topical classification of a query.
///
/// Domains select threshold tables, quality weights, verifier models and
/// multi-step pipelines.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Domain {
    #[default]
    General,
    Code,
    Data,
    Math,
    Medical,
    Legal,
    Financial,
    Science,
    Creative,
}

/// Ordered query difficulty tiers.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ComplexityTier {
    /// Single-fact lookups, arithmetic, greetings.
    Trivial,
    /// Short factual questions.
    #[default]
    Simple,
    /// Explanations and moderate analysis.
    Moderate,
    /// Multi-step reasoning, design, code generation.
    Complex,
    /// Specialist-level work combining several hard signals.
    Expert,
}

/// Budget tracking windows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
    Total,
}

/// Static description of a model in the candidate catalog.
///
/// Supplied by configuration and never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDescriptor {
    /// Model identifier passed to the provider (e.g. "gpt-4o-mini").
    pub name: String,
    /// Provider identifier used to look up the provider adapter.
    pub provider: String,
    /// Cost per 1,000 input tokens in USD.
    #[serde(default)]
    pub input_cost_per_1k: f64,
    /// Cost per 1,000 output tokens in USD.
    #[serde(default)]
    pub output_cost_per_1k: f64,
    /// Nominal quality prior in [0, 1].
    #[serde(default = "default_quality")]
    pub quality: f64,
    /// Nominal latency in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
    /// Domains this model is suited for. Empty means every domain.
    #[serde(default)]
    pub domains: Vec<Domain>,
}

fn default_quality() -> f64 {
    0.7
}

impl ModelDescriptor {
    /// Whether this model is applicable to the given domain.
    pub fn applies_to(&self, domain: Domain) -> bool {
        self.domains.is_empty() || self.domains.contains(&domain)
    }

    /// Average of input and output price per 1,000 tokens.
    pub fn blended_cost_per_1k(&self) -> f64 {
        (self.input_cost_per_1k + self.output_cost_per_1k) / 2.0
    }
}

/// Token usage reported (or estimated) for one provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Per-query context, created once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    /// Raw query text.
    pub text: String,
    /// Resolved domain (override wins over detection).
    pub domain: Domain,
    /// Confidence of the domain resolution (1.0 for explicit overrides).
    pub domain_confidence: f64,
    /// Resolved complexity tier.
    pub complexity: ComplexityTier,
    /// Identity (user) the query is billed to.
    pub identity: String,
    /// Service plan of the identity.
    pub plan: String,
    /// Explicit domain override supplied by the caller, if any.
    pub domain_override: Option<Domain>,
}

/// A request handed to a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    /// Prompt text sent to the model.
    pub prompt: String,
    /// Domain of the originating query.
    pub domain: Domain,
    /// Complexity of the originating query.
    pub complexity: ComplexityTier,
}

impl ProviderRequest {
    pub fn from_context(ctx: &QueryContext) -> Self {
        Self {
            prompt: ctx.text.clone(),
            domain: ctx.domain,
            complexity: ctx.complexity,
        }
    }
}

/// Normalized provider output. Provider-specific wire formats never leak past this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text.
    pub text: String,
    /// Token usage, when the provider reports it.
    pub usage: Option<TokenUsage>,
    /// Cost in USD, when the provider reports it.
    pub cost_usd: Option<f64>,
    /// Raw provider metadata, passed through untouched.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// The result of one model invocation within a cascade run.
///
/// Owned by the run that produced it; never shared across queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftResult {
    pub text: String,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub model: String,
    pub latency: Duration,
    pub metadata: serde_json::Value,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    DomainClassifier,
}
