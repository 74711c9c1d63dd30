// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! threshold ranges, ordered enforcement fractions, and model references that
//! must resolve against the catalog.

use std::collections::HashSet;

use crate::diagnostic::{suggest_key, ConfigError};
use crate::model::{BudgetLimits, DraftwiseConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DraftwiseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_catalog(config, &mut errors);
    validate_thresholds(config, &mut errors);
    validate_quality(config, &mut errors);
    validate_budget(config, &mut errors);
    validate_model_references(config, &mut errors);

    if config.engine.provider_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.provider_timeout_ms must be greater than 0".to_string(),
        });
    }

    if !config.budget.plans.contains_key(&config.engine.default_plan) {
        let plans: Vec<&str> = config.budget.plans.keys().map(String::as_str).collect();
        let hint = suggest_key(&config.engine.default_plan, &plans)
            .map(|s| format!(" (did you mean `{s}`?)"))
            .unwrap_or_default();
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.default_plan `{}` is not declared under [budget.plans]{hint}",
                config.engine.default_plan
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_catalog(config: &DraftwiseConfig, errors: &mut Vec<ConfigError>) {
    if config.models.is_empty() {
        errors.push(ConfigError::Validation {
            message: "[[models]] must declare at least one model".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (i, model) in config.models.iter().enumerate() {
        if model.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("models[{i}].name must not be empty"),
            });
        }
        if model.provider.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("models[{i}].provider must not be empty"),
            });
        }
        if !seen.insert(model.name.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate model name `{}` in [[models]] array", model.name),
            });
        }
        if model.input_cost_per_1k < 0.0 || model.output_cost_per_1k < 0.0 {
            errors.push(ConfigError::Validation {
                message: format!("models[{i}] `{}` has a negative cost", model.name),
            });
        }
        check_unit(&format!("models[{i}].quality"), model.quality, errors);
    }
}

fn validate_thresholds(config: &DraftwiseConfig, errors: &mut Vec<ConfigError>) {
    let cascade = &config.cascade;
    check_unit("cascade.global_threshold", cascade.global_threshold, errors);
    for (tier, value) in &cascade.tier_thresholds {
        check_unit(&format!("cascade.tier_thresholds.{tier}"), *value, errors);
    }
    for (domain, value) in &cascade.domain_thresholds {
        check_unit(&format!("cascade.domain_thresholds.{domain}"), *value, errors);
    }
    for (domain, floors) in &cascade.domain_floors {
        let named = [
            ("hedging", floors.hedging),
            ("coherence", floors.coherence),
            ("completeness", floors.completeness),
            ("alignment", floors.alignment),
            ("toxicity", floors.toxicity),
        ];
        for (name, floor) in named {
            if let Some(value) = floor {
                check_unit(&format!("cascade.domain_floors.{domain}.{name}"), value, errors);
            }
        }
    }

    check_unit(
        "routing.semantic_confidence_floor",
        config.routing.semantic_confidence_floor,
        errors,
    );
    check_unit("confidence.prior_weight", config.confidence.prior_weight, errors);
    for (tier, value) in &config.confidence.tier_discounts {
        check_unit(&format!("confidence.tier_discounts.{tier}"), *value, errors);
    }

    for (domain, pipeline) in &config.pipelines {
        if pipeline.steps.is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("pipelines.{domain} must declare at least one step"),
            });
        }
        for step in &pipeline.steps {
            if let Some(min) = step.min_confidence {
                check_unit(
                    &format!("pipelines.{domain}.steps.{}.min_confidence", step.name),
                    min,
                    errors,
                );
            }
        }
    }
}

fn validate_quality(config: &DraftwiseConfig, errors: &mut Vec<ConfigError>) {
    let all = std::iter::once(("quality.weights".to_string(), &config.quality.weights)).chain(
        config
            .quality
            .domain_weights
            .iter()
            .map(|(d, w)| (format!("quality.domain_weights.{d}"), w)),
    );
    for (path, weights) in all {
        let parts = [
            weights.hedging,
            weights.coherence,
            weights.completeness,
            weights.alignment,
            weights.toxicity,
        ];
        if parts.iter().any(|w| *w < 0.0) {
            errors.push(ConfigError::Validation {
                message: format!("{path} must not contain negative weights"),
            });
        } else if weights.sum() <= 0.0 {
            errors.push(ConfigError::Validation {
                message: format!("{path} must have a positive sum"),
            });
        }
    }
}

fn validate_budget(config: &DraftwiseConfig, errors: &mut Vec<ConfigError>) {
    let budget = &config.budget;
    if !(0.0 < budget.warn_at && budget.warn_at <= budget.degrade_at && budget.degrade_at <= budget.block_at)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "budget fractions must satisfy 0 < warn_at <= degrade_at <= block_at, got {} / {} / {}",
                budget.warn_at, budget.degrade_at, budget.block_at
            ),
        });
    }
    check_unit(
        "budget.degrade_ceiling_fraction",
        budget.degrade_ceiling_fraction,
        errors,
    );

    check_limits("budget.global", &budget.global, errors);
    for (name, plan) in &budget.plans {
        check_limits(&format!("budget.plans.{name}"), &plan.limits(), errors);
    }
    for (identity, limits) in &budget.identities {
        check_limits(&format!("budget.identities.{identity}"), limits, errors);
    }
}

fn validate_model_references(config: &DraftwiseConfig, errors: &mut Vec<ConfigError>) {
    let names: Vec<&str> = config.models.iter().map(|m| m.name.as_str()).collect();
    let mut check = |context: String, model: &str| {
        if !names.contains(&model) {
            errors.push(ConfigError::UnknownModel {
                context,
                model: model.to_string(),
                suggestion: suggest_key(model, &names),
            });
        }
    };

    if let Some(verifier) = &config.cascade.verifier_model {
        check("cascade.verifier_model".to_string(), verifier);
    }
    for (domain, verifier) in &config.cascade.domain_verifiers {
        check(format!("cascade.domain_verifiers.{domain}"), verifier);
    }
    for (name, plan) in &config.budget.plans {
        for model in &plan.allowed_models {
            check(format!("budget.plans.{name}.allowed_models"), model);
        }
    }
    for (domain, pipeline) in &config.pipelines {
        for step in &pipeline.steps {
            check(format!("pipelines.{domain}.steps.{}.model", step.name), &step.model);
            if let Some(fallback) = &step.fallback_model {
                check(
                    format!("pipelines.{domain}.steps.{}.fallback_model", step.name),
                    fallback,
                );
            }
        }
    }
}

fn check_unit(path: &str, value: f64, errors: &mut Vec<ConfigError>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::Validation {
            message: format!("{path} must be within [0.0, 1.0], got {value}"),
        });
    }
}

fn check_limits(path: &str, limits: &BudgetLimits, errors: &mut Vec<ConfigError>) {
    let named = [
        ("daily_usd", limits.daily_usd),
        ("weekly_usd", limits.weekly_usd),
        ("monthly_usd", limits.monthly_usd),
        ("total_usd", limits.total_usd),
    ];
    for (name, limit) in named {
        if let Some(value) = limit {
            if value < 0.0 {
                errors.push(ConfigError::Validation {
                    message: format!("{path}.{name} must be non-negative, got {value}"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use draftwise_core::{ComplexityTier, Domain};

    use super::*;
    use crate::model::{PipelineConfig, PipelineStepConfig};

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = DraftwiseConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = DraftwiseConfig::default();
        config.cascade.tier_thresholds.insert(ComplexityTier::Expert, 1.5);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "cascade.tier_thresholds.expert"));
    }

    #[test]
    fn negative_budget_fails_validation() {
        let mut config = DraftwiseConfig::default();
        config.budget.global.daily_usd = Some(-5.0);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "budget.global.daily_usd"));
    }

    #[test]
    fn unordered_enforcement_fractions_fail_validation() {
        let mut config = DraftwiseConfig::default();
        config.budget.warn_at = 0.95;
        config.budget.degrade_at = 0.9;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "warn_at <= degrade_at"));
    }

    #[test]
    fn duplicate_model_names_fail_validation() {
        let mut config = DraftwiseConfig::default();
        let copy = config.models[0].clone();
        config.models.push(copy);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate model name"));
    }

    #[test]
    fn unknown_verifier_reports_suggestion() {
        let mut config = DraftwiseConfig::default();
        config.cascade.verifier_model = Some("gpt-4o-mni".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownModel { suggestion: Some(s), .. } if s == "gpt-4o-mini"
        )));
    }

    #[test]
    fn pipeline_models_must_exist() {
        let mut config = DraftwiseConfig::default();
        config.pipelines.insert(
            Domain::Medical,
            PipelineConfig {
                steps: vec![PipelineStepConfig {
                    name: "draft".to_string(),
                    model: "gpt-4o-mini".to_string(),
                    fallback_model: Some("no-such-model".to_string()),
                    min_confidence: Some(0.7),
                    retry_budget: 0,
                }],
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownModel { model, .. } if model == "no-such-model"
        )));
    }

    #[test]
    fn empty_pipeline_fails_validation() {
        let mut config = DraftwiseConfig::default();
        config.pipelines.insert(Domain::Legal, PipelineConfig::default());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "pipelines.legal must declare at least one step"));
    }

    #[test]
    fn zero_weight_sum_fails_validation() {
        let mut config = DraftwiseConfig::default();
        config.quality.weights.hedging = 0.0;
        config.quality.weights.coherence = 0.0;
        config.quality.weights.completeness = 0.0;
        config.quality.weights.alignment = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "positive sum"));
    }

    #[test]
    fn undeclared_default_plan_fails_validation() {
        let mut config = DraftwiseConfig::default();
        config.engine.default_plan = "fre".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "did you mean `free`"));
    }

    #[test]
    fn models_deny_unknown_fields() {
        let toml_str = r#"
[[models]]
name = "m"
provider = "p"
price = 1.0
"#;
        assert!(toml::from_str::<DraftwiseConfig>(toml_str).is_err());
    }

    #[test]
    fn domain_keyed_tables_deserialize() {
        let toml_str = r#"
[cascade.domain_thresholds]
code = 0.65

[cascade.domain_floors.medical]
completeness = 0.9

[[pipelines.medical.steps]]
name = "draft"
model = "gpt-4o-mini"
fallback_model = "claude-haiku-4-5"
"#;
        let config: DraftwiseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cascade.domain_thresholds[&Domain::Code], 0.65);
        assert_eq!(
            config.cascade.domain_floors[&Domain::Medical].completeness,
            Some(0.9)
        );
        let steps = &config.pipelines[&Domain::Medical].steps;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].retry_budget, 0);
        assert!(validate_config(&config).is_ok());
    }
}
