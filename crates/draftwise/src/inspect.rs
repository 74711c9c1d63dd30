// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `draftwise classify` and `draftwise select` command implementations.
//!
//! Both run the rule-based router offline. No provider is contacted.

use draftwise_config::DraftwiseConfig;
use draftwise_core::{ComplexityTier, Domain, DraftwiseError};
use draftwise_router::{ComplexityAnalyzer, DomainDetector, ModelSelector, SelectionRequest};
use serde::Serialize;

/// Structured output of `draftwise classify --json`.
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub domain: Domain,
    pub domain_confidence: f64,
    pub complexity: ComplexityTier,
    pub complexity_score: u32,
    pub word_count: usize,
    pub signals: Vec<&'static str>,
}

/// One candidate in `draftwise select --json` output.
#[derive(Debug, Serialize)]
pub struct Candidate {
    pub model: String,
    pub provider: String,
    pub quality: f64,
    pub estimate_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub domain: Domain,
    pub complexity: ComplexityTier,
    pub plan: String,
    pub candidates: Vec<Candidate>,
}

pub fn classify(query: &str) -> ClassifyResponse {
    let detection = DomainDetector::new().detect(query);
    let analysis = ComplexityAnalyzer::new().score(query, detection.domain);
    ClassifyResponse {
        domain: detection.domain,
        domain_confidence: detection.confidence,
        complexity: analysis.tier,
        complexity_score: analysis.score,
        word_count: analysis.word_count,
        signals: analysis.signals,
    }
}

pub fn select(
    config: &DraftwiseConfig,
    query: &str,
    plan: &str,
    budget: Option<f64>,
) -> SelectResponse {
    let classified = classify(query);
    let selector = ModelSelector::from_config(config);
    let candidates = selector
        .select(&SelectionRequest {
            domain: classified.domain,
            complexity: classified.complexity,
            plan,
            budget_remaining: budget,
        })
        .into_iter()
        .map(|m| Candidate {
            estimate_usd: selector.estimate_cost(&m, classified.complexity),
            model: m.name,
            provider: m.provider,
            quality: m.quality,
        })
        .collect();
    SelectResponse {
        domain: classified.domain,
        complexity: classified.complexity,
        plan: plan.to_string(),
        candidates,
    }
}

/// Run the `draftwise classify` command.
pub fn run_classify(query: &str, json: bool) -> Result<(), DraftwiseError> {
    let response = classify(query);
    if json {
        return print_json(&response);
    }
    println!(
        "domain:     {} (confidence {:.2})",
        response.domain, response.domain_confidence
    );
    println!(
        "complexity: {} (score {}, {} words)",
        response.complexity, response.complexity_score, response.word_count
    );
    if !response.signals.is_empty() {
        println!("signals:    {}", response.signals.join(", "));
    }
    Ok(())
}

/// Run the `draftwise select` command.
pub fn run_select(
    config: &DraftwiseConfig,
    query: &str,
    plan: &str,
    budget: Option<f64>,
    json: bool,
) -> Result<(), DraftwiseError> {
    let response = select(config, query, plan, budget);
    if json {
        return print_json(&response);
    }
    println!(
        "{} / {} on plan `{}`",
        response.domain, response.complexity, response.plan
    );
    if response.candidates.is_empty() {
        println!("no affordable candidate");
        return Ok(());
    }
    for (i, c) in response.candidates.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:<10} quality {:.2}  est ${:.6}",
            i + 1,
            c.model,
            c.provider,
            c.quality,
            c.estimate_usd
        );
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), DraftwiseError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| DraftwiseError::Internal(format!("failed to serialize output: {e}")))?;
    println!("{out}");
    Ok(())
}
