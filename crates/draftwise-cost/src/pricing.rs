// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost calculation from catalog prices.
//!
//! Prices come from each [`ModelDescriptor`] (USD per 1,000 tokens). A cost
//! reported by the provider always wins over the computed one; usage is
//! estimated from text length when the provider reports none.

use draftwise_core::{ModelDescriptor, ProviderResponse, TokenUsage};

/// Rough characters-per-token ratio used when a provider reports no usage.
const CHARS_PER_TOKEN: usize = 4;

/// Cost in USD of `usage` at the descriptor's per-1k prices.
pub fn calculate_cost(model: &ModelDescriptor, usage: &TokenUsage) -> f64 {
    let input = (usage.input_tokens as f64 / 1_000.0) * model.input_cost_per_1k;
    let output = (usage.output_tokens as f64 / 1_000.0) * model.output_cost_per_1k;
    input + output
}

/// Token estimate for a piece of text (at least one token for non-empty text).
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Usage estimate for a prompt and its completion.
pub fn estimate_usage(prompt: &str, completion: &str) -> TokenUsage {
    TokenUsage {
        input_tokens: estimate_tokens(prompt),
        output_tokens: estimate_tokens(completion),
    }
}

/// Realized usage and cost of a provider response.
///
/// Reported usage is taken as-is; missing usage is estimated. A reported cost
/// wins over the catalog price.
pub fn settle(model: &ModelDescriptor, prompt: &str, response: &ProviderResponse) -> (TokenUsage, f64) {
    let usage = response
        .usage
        .unwrap_or_else(|| estimate_usage(prompt, &response.text));
    let cost = match response.cost_usd {
        Some(reported) if reported.is_finite() && reported >= 0.0 => reported,
        _ => calculate_cost(model, &usage),
    };
    (usage, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelDescriptor {
        ModelDescriptor {
            name: "gpt-4o-mini".into(),
            provider: "openai".into(),
            input_cost_per_1k: 0.00015,
            output_cost_per_1k: 0.0006,
            quality: 0.75,
            latency_ms: 400,
            domains: vec![],
        }
    }

    #[test]
    fn cost_uses_per_1k_prices() {
        let usage = TokenUsage {
            input_tokens: 2_000,
            output_tokens: 500,
        };
        let cost = calculate_cost(&model(), &usage);
        let expected = 2.0 * 0.00015 + 0.5 * 0.0006;
        assert!((cost - expected).abs() < 1e-12, "expected {expected}, got {cost}");
    }

    #[test]
    fn zero_tokens_zero_cost() {
        assert_eq!(calculate_cost(&model(), &TokenUsage::default()), 0.0);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn reported_cost_wins() {
        let response = ProviderResponse {
            text: "4".into(),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 1,
            }),
            cost_usd: Some(0.5),
            ..ProviderResponse::default()
        };
        let (usage, cost) = settle(&model(), "What is 2+2?", &response);
        assert_eq!(usage.total(), 11);
        assert_eq!(cost, 0.5);
    }

    #[test]
    fn missing_usage_is_estimated() {
        let response = ProviderResponse {
            text: "The answer is four.".into(),
            ..ProviderResponse::default()
        };
        let (usage, cost) = settle(&model(), "What is 2+2?", &response);
        assert_eq!(usage.input_tokens, 3);
        assert_eq!(usage.output_tokens, 5);
        assert!(cost > 0.0);
    }

    #[test]
    fn negative_reported_cost_is_ignored() {
        let response = ProviderResponse {
            text: "x".into(),
            usage: Some(TokenUsage {
                input_tokens: 1_000,
                output_tokens: 0,
            }),
            cost_usd: Some(-1.0),
            ..ProviderResponse::default()
        };
        let (_, cost) = settle(&model(), "q", &response);
        assert!((cost - 0.00015).abs() < 1e-12);
    }
}
