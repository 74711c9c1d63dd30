// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `draftwise check` command implementation.
//!
//! Configuration is validated on load, so reaching this command means the
//! file is usable. Prints a summary of what the engine would be built with.

use draftwise_config::DraftwiseConfig;
use draftwise_core::DraftwiseError;
use tracing::warn;

/// Run the `draftwise check` command.
pub fn run_check(config: &DraftwiseConfig) -> Result<(), DraftwiseError> {
    for line in summary(config) {
        println!("{line}");
    }
    if config.routing.semantic_fallback {
        warn!("routing.semantic_fallback requires an embedder or classifier attached by the host");
    }
    Ok(())
}

fn summary(config: &DraftwiseConfig) -> Vec<String> {
    let mut lines = vec!["config ok".to_string()];

    let mut providers: Vec<&str> = config.models.iter().map(|m| m.provider.as_str()).collect();
    providers.sort_unstable();
    providers.dedup();
    lines.push(format!(
        "  models:     {} ({} provider(s): {})",
        config.models.len(),
        providers.len(),
        providers.join(", ")
    ));

    let mut plans: Vec<&String> = config.budget.plans.keys().collect();
    plans.sort();
    lines.push(format!(
        "  plans:      {} (default `{}`)",
        plans
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.engine.default_plan
    ));

    let mut pipelines: Vec<String> = config
        .pipelines
        .iter()
        .map(|(domain, p)| format!("{domain} ({} steps)", p.steps.len()))
        .collect();
    pipelines.sort();
    lines.push(format!(
        "  pipelines:  {}",
        if pipelines.is_empty() {
            "none".to_string()
        } else {
            pipelines.join(", ")
        }
    ));

    lines.push(format!(
        "  threshold:  {:.2} global, verifier {}",
        config.cascade.global_threshold,
        config
            .cascade
            .verifier_model
            .as_deref()
            .unwrap_or("highest-quality candidate")
    ));
    lines.push(format!(
        "  budget:     {} enforcement, warn {:.0}% / degrade {:.0}% / block {:.0}%",
        format!("{:?}", config.budget.enforcement).to_lowercase(),
        config.budget.warn_at * 100.0,
        config.budget.degrade_at * 100.0,
        config.budget.block_at * 100.0
    ));
    lines
}
