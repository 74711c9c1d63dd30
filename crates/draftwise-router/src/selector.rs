// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget-aware candidate model selection.
//!
//! Filters the catalog by domain applicability, the plan's allow-list and an
//! affordability estimate, then orders the survivors per the plan's
//! selection order. An empty result is a value, not an error.
//!
//! The trivial-query cost ceiling only narrows draft selection; escalation
//! candidates are filtered by plan and budget alone.

use std::cmp::Ordering;
use std::collections::HashMap;

use draftwise_config::model::{DraftwiseConfig, PlanConfig, SelectionOrder};
use draftwise_core::{ComplexityTier, Domain, ModelDescriptor};
use strum::IntoEnumIterator;
use tracing::debug;

/// Inputs to a selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRequest<'a> {
    pub domain: Domain,
    pub complexity: ComplexityTier,
    /// Identity plan name. Unknown plans fall back to the default plan.
    pub plan: &'a str,
    /// Remaining budget in USD. `None` means unlimited.
    pub budget_remaining: Option<f64>,
}

/// Produces ordered candidate lists from the model catalog.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    catalog: Vec<ModelDescriptor>,
    token_estimates: HashMap<ComplexityTier, u32>,
    plans: HashMap<String, PlanConfig>,
    default_plan: PlanConfig,
    trivial_ceiling: Option<f64>,
}

impl ModelSelector {
    pub fn from_config(config: &DraftwiseConfig) -> Self {
        let default_plan = config
            .budget
            .plans
            .get(&config.engine.default_plan)
            .cloned()
            .unwrap_or_default();
        Self {
            catalog: config.models.clone(),
            token_estimates: ComplexityTier::iter()
                .map(|tier| (tier, config.routing.token_estimate(tier)))
                .collect(),
            plans: config.budget.plans.clone(),
            default_plan,
            trivial_ceiling: config.engine.trivial_cost_ceiling_usd,
        }
    }

    /// The full catalog.
    pub fn catalog(&self) -> &[ModelDescriptor] {
        &self.catalog
    }

    /// Look up a catalog entry by name.
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.catalog.iter().find(|m| m.name == name)
    }

    /// Resolve a plan by name, falling back to the default plan.
    pub fn plan(&self, name: &str) -> &PlanConfig {
        self.plans.get(name).unwrap_or(&self.default_plan)
    }

    /// Conservative token estimate for a tier.
    pub fn token_estimate(&self, tier: ComplexityTier) -> u32 {
        self.token_estimates.get(&tier).copied().unwrap_or(0)
    }

    /// Pre-invocation cost estimate of `model` for a query of `tier`.
    pub fn estimate_cost(&self, model: &ModelDescriptor, tier: ComplexityTier) -> f64 {
        model.blended_cost_per_1k() * f64::from(self.token_estimate(tier)) / 1000.0
    }

    /// Ordered draft candidates for `request`. Empty when nothing is allowed
    /// or affordable.
    pub fn select(&self, request: &SelectionRequest<'_>) -> Vec<ModelDescriptor> {
        let ceiling = match request.complexity {
            ComplexityTier::Trivial => self.trivial_ceiling,
            _ => None,
        };
        self.select_within(request, ceiling)
    }

    /// Models a low-confidence draft may escalate to: the plan allow-list and
    /// affordability still apply, the trivial-query ceiling does not.
    pub fn escalation_candidates(&self, request: &SelectionRequest<'_>) -> Vec<ModelDescriptor> {
        self.select_within(request, None)
    }

    fn select_within(
        &self,
        request: &SelectionRequest<'_>,
        trivial_ceiling: Option<f64>,
    ) -> Vec<ModelDescriptor> {
        let plan = self.plan(request.plan);

        let mut candidates: Vec<(ModelDescriptor, f64)> = self
            .catalog
            .iter()
            .filter(|m| m.applies_to(request.domain))
            .filter(|m| plan.allows(&m.name))
            .map(|m| (m.clone(), self.estimate_cost(m, request.complexity)))
            .filter(|(_, estimate)| {
                request
                    .budget_remaining
                    .is_none_or(|remaining| *estimate <= remaining)
            })
            .collect();

        if let Some(ceiling) = trivial_ceiling {
            if candidates.iter().any(|(_, e)| *e <= ceiling) {
                candidates.retain(|(_, e)| *e <= ceiling);
            }
        }

        match plan.selection {
            SelectionOrder::CheapestFirst => candidates.sort_by(|(a, ea), (b, eb)| {
                total_cmp(*ea, *eb)
                    .then_with(|| total_cmp(b.quality, a.quality))
                    .then_with(|| a.name.cmp(&b.name))
            }),
            SelectionOrder::QualityFirst => candidates.sort_by(|(a, ea), (b, eb)| {
                total_cmp(b.quality, a.quality)
                    .then_with(|| total_cmp(*ea, *eb))
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }

        let selected: Vec<ModelDescriptor> = candidates.into_iter().map(|(m, _)| m).collect();
        debug!(
            domain = %request.domain,
            complexity = %request.complexity,
            plan = request.plan,
            budget_remaining = ?request.budget_remaining,
            candidates = ?selected.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "candidates selected"
        );
        selected
    }
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
