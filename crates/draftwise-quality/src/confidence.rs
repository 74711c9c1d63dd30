// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confidence estimation.
//!
//! Fuses the validator's aggregate with the model's static quality prior and
//! discounts by complexity tier. Stateless: identical inputs always yield
//! identical output.

use std::collections::HashMap;

use draftwise_config::model::ConfidenceConfig;
use draftwise_core::{ComplexityTier, ModelDescriptor};

use crate::validator::QualityScore;

#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    prior_weight: f64,
    tier_discounts: HashMap<ComplexityTier, f64>,
}

impl ConfidenceEstimator {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            prior_weight: config.prior_weight.clamp(0.0, 1.0),
            tier_discounts: config.tier_discounts.clone(),
        }
    }

    /// `clamp((1 - w) * aggregate + w * prior - discount(tier), 0, 1)`.
    pub fn estimate(
        &self,
        score: &QualityScore,
        tier: ComplexityTier,
        model: &ModelDescriptor,
    ) -> f64 {
        let discount = self.tier_discounts.get(&tier).copied().unwrap_or(0.0);
        let fused = (1.0 - self.prior_weight) * score.aggregate
            + self.prior_weight * model.quality.clamp(0.0, 1.0);
        (fused - discount).clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}
