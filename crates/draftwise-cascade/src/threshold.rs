// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Acceptance thresholds and component floors.

use std::collections::HashMap;

use draftwise_config::model::{CascadeConfig, ComponentFloors};
use draftwise_core::{ComplexityTier, Domain};

/// Resolves the acceptance threshold for a (domain, tier) pair.
///
/// Lookup order: domain-specific entry, then the tier default, then the
/// global default.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    global: f64,
    tiers: HashMap<ComplexityTier, f64>,
    domains: HashMap<Domain, f64>,
    floors: HashMap<Domain, ComponentFloors>,
}

impl ThresholdTable {
    pub fn new(global: f64) -> Self {
        Self {
            global,
            tiers: HashMap::new(),
            domains: HashMap::new(),
            floors: HashMap::new(),
        }
    }

    pub fn from_config(config: &CascadeConfig) -> Self {
        Self {
            global: config.global_threshold,
            tiers: config.tier_thresholds.clone(),
            domains: config.domain_thresholds.clone(),
            floors: config.domain_floors.clone(),
        }
    }

    pub fn with_tier(mut self, tier: ComplexityTier, threshold: f64) -> Self {
        self.tiers.insert(tier, threshold);
        self
    }

    pub fn with_domain(mut self, domain: Domain, threshold: f64) -> Self {
        self.domains.insert(domain, threshold);
        self
    }

    pub fn with_floors(mut self, domain: Domain, floors: ComponentFloors) -> Self {
        self.floors.insert(domain, floors);
        self
    }

    pub fn resolve(&self, domain: Domain, tier: ComplexityTier) -> f64 {
        self.domains
            .get(&domain)
            .or_else(|| self.tiers.get(&tier))
            .copied()
            .unwrap_or(self.global)
    }

    /// Component floors for `domain`. Empty when none are configured.
    pub fn floors(&self, domain: Domain) -> ComponentFloors {
        self.floors.get(&domain).copied().unwrap_or_default()
    }
}
