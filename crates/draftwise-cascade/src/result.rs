// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cascade run inputs, outputs and the per-step trace.

use draftwise_core::{ComplexityTier, Domain, DraftResult};
use draftwise_cost::EnforcementAction;
use draftwise_quality::QualityScore;
use serde::Serialize;

use crate::decision::CascadeDecision;
use crate::state::CascadeState;

/// One query submitted to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeRequest {
    pub query: String,
    /// Identity billed for the query.
    pub identity: String,
    /// Identity service plan. Unknown plans use the default plan.
    pub plan: String,
    /// Skips domain detection when set.
    pub domain_override: Option<Domain>,
}

impl CascadeRequest {
    pub fn new(
        query: impl Into<String>,
        identity: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            identity: identity.into(),
            plan: plan.into(),
            domain_override: None,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain_override = Some(domain);
        self
    }
}

/// How a traced step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Output passed validation (or was a verifier's terminal answer).
    Accepted,
    /// Output was produced but failed validation.
    Rejected,
    /// The provider call failed or timed out.
    ProviderFailed,
    /// Budget admission denied the call.
    BudgetDenied,
}

/// Trace entry for one model invocation within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTrace {
    /// `draft`, `verify`, or the pipeline step name.
    pub step: String,
    pub model: String,
    pub state: CascadeState,
    pub outcome: StepOutcome,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub confidence: Option<f64>,
    pub error: Option<String>,
}

impl StepTrace {
    pub(crate) fn completed(
        step: &str,
        state: CascadeState,
        draft: &DraftResult,
        confidence: f64,
        outcome: StepOutcome,
    ) -> Self {
        Self {
            step: step.to_string(),
            model: draft.model.clone(),
            state,
            outcome,
            cost_usd: draft.cost_usd,
            latency_ms: u64::try_from(draft.latency.as_millis()).unwrap_or(u64::MAX),
            confidence: Some(confidence),
            error: None,
        }
    }

    pub(crate) fn failed(
        step: &str,
        state: CascadeState,
        model: &str,
        outcome: StepOutcome,
        error: String,
    ) -> Self {
        Self {
            step: step.to_string(),
            model: model.to_string(),
            state,
            outcome,
            cost_usd: 0.0,
            latency_ms: 0,
            confidence: None,
            error: Some(error),
        }
    }
}

/// Final outcome of a cascade run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeResult {
    pub text: String,
    /// Model that produced `text`.
    pub model: String,
    /// Models invoked successfully, in call order.
    pub models_used: Vec<String>,
    pub total_cost_usd: f64,
    pub trace: Vec<StepTrace>,
    /// Confidence of the returned text.
    pub confidence: f64,
    pub domain: Domain,
    pub domain_confidence: f64,
    pub complexity: ComplexityTier,
    /// Quality breakdown of the returned text.
    pub quality: Option<QualityScore>,
    /// The draft decision of a flat cascade, or the pipeline's outcome.
    /// `None` when the draft call of a flat cascade failed.
    pub decision: Option<CascadeDecision>,
    /// Content returned without passing validation.
    pub degraded: bool,
    /// A verifier (or a later pipeline step) produced the returned text.
    pub escalated: bool,
    /// Strongest budget action seen during admission.
    pub budget_action: EnforcementAction,
}
