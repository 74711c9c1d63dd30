// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Draftwise cascade engine.
//!
//! This crate provides the shared data model, the error taxonomy, and the
//! collaborator traits (providers, embedders, domain classifiers) used
//! throughout the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BudgetExceeded, DraftwiseError};
pub use types::{
    AdapterType, BudgetPeriod, ComplexityTier, Domain, DraftResult, HealthStatus,
    ModelDescriptor, ProviderRequest, ProviderResponse, QueryContext, TokenUsage,
};

pub use traits::{DomainClassifierAdapter, EmbeddingAdapter, PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::time::Duration;

    use async_trait::async_trait;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = DraftwiseError::Config("test".into());
        let _provider = DraftwiseError::provider("m", "boom");
        let _timeout = DraftwiseError::Timeout {
            model: "m".into(),
            duration: Duration::from_secs(30),
        };
        let _cancelled = DraftwiseError::Cancelled;
        let _internal = DraftwiseError::Internal("test".into());
    }

    #[test]
    fn only_provider_failures_are_recoverable() {
        assert!(DraftwiseError::provider("m", "boom").is_recoverable());
        assert!(
            DraftwiseError::Timeout {
                model: "m".into(),
                duration: Duration::from_millis(5),
            }
            .is_recoverable()
        );
        assert!(!DraftwiseError::Config("x".into()).is_recoverable());
        assert!(!DraftwiseError::Cancelled.is_recoverable());
    }

    #[test]
    fn budget_exceeded_display_mentions_period_and_reset() {
        let err = BudgetExceeded {
            identity: "alice".into(),
            period: BudgetPeriod::Daily,
            limit_usd: 0.10,
            spent_usd: 0.095,
            requested_usd: 0.02,
            resets_at: None,
        };
        let msg = DraftwiseError::from(err).to_string();
        assert!(msg.contains("daily budget"), "got: {msg}");
        assert!(msg.contains("alice"));
        assert!(msg.contains("does not reset"));
    }

    #[test]
    fn complexity_tiers_are_ordered() {
        let tiers: Vec<_> = ComplexityTier::iter().collect();
        assert_eq!(tiers.len(), 5);
        assert!(tiers.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ComplexityTier::Trivial.to_string(), "trivial");
        assert_eq!(
            ComplexityTier::from_str("Expert").unwrap(),
            ComplexityTier::Expert
        );
    }

    #[test]
    fn domain_round_trips_through_strings_and_serde() {
        for domain in Domain::iter() {
            let parsed = Domain::from_str(&domain.to_string()).expect("should parse back");
            assert_eq!(domain, parsed);
        }
        let json = serde_json::to_string(&Domain::Medical).unwrap();
        assert_eq!(json, "\"medical\"");
    }

    #[test]
    fn descriptor_domain_applicability() {
        let mut model = ModelDescriptor {
            name: "m".into(),
            provider: "p".into(),
            input_cost_per_1k: 0.001,
            output_cost_per_1k: 0.003,
            quality: 0.8,
            latency_ms: 300,
            domains: vec![],
        };
        assert!(model.applies_to(Domain::Legal));
        model.domains = vec![Domain::Code];
        assert!(model.applies_to(Domain::Code));
        assert!(!model.applies_to(Domain::Legal));
        assert!((model.blended_cost_per_1k() - 0.002).abs() < 1e-12);
    }

    struct NullProvider;

    #[async_trait]
    impl PluginAdapter for NullProvider {
        fn name(&self) -> &str {
            "null"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
    }

    #[async_trait]
    impl ProviderAdapter for NullProvider {
        async fn invoke(
            &self,
            _model: &ModelDescriptor,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, DraftwiseError> {
            Ok(ProviderResponse::default())
        }
    }

    #[tokio::test]
    async fn provider_defaults_capabilities_and_health() {
        let provider: Box<dyn ProviderAdapter> = Box::new(NullProvider);
        assert!(!provider.supports_streaming());
        assert!(provider.reports_usage());
        assert_eq!(provider.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
