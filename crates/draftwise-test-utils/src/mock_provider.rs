// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted replies per
//! model, enabling fast, CI-runnable tests without external API calls.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use draftwise_core::{
    AdapterType, DraftwiseError, HealthStatus, ModelDescriptor, PluginAdapter, ProviderAdapter,
    ProviderRequest, ProviderResponse, TokenUsage,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this text.
    Text(String),
    /// Fail with a recoverable provider error carrying this message.
    Error(String),
    /// Sleep, then answer with the text. Used to exercise timeouts.
    Delayed(Duration, String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// A mock LLM provider that returns scripted replies.
///
/// Replies are popped from a FIFO queue per model. When a model's queue is
/// empty, a default "mock response" text is returned. Every call is logged.
pub struct MockProvider {
    name: String,
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<Vec<(String, String)>>,
    usage: Option<TokenUsage>,
    health: HealthStatus,
}

impl MockProvider {
    /// Create a mock provider registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            }),
            health: HealthStatus::Healthy,
        }
    }

    /// Queue replies for `model`.
    pub fn with_replies(
        mut self,
        model: &str,
        replies: impl IntoIterator<Item = MockReply>,
    ) -> Self {
        self.replies
            .get_mut()
            .entry(model.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Leave usage out of responses so callers must estimate it.
    pub fn without_usage(mut self) -> Self {
        self.usage = None;
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    /// Queue a reply for `model` after construction.
    pub async fn push_reply(&self, model: &str, reply: MockReply) {
        self.replies
            .lock()
            .await
            .entry(model.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Models invoked so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Prompts sent so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|(_, p)| p.clone()).collect()
    }

    async fn next_reply(&self, model: &str) -> MockReply {
        self.replies
            .lock()
            .await
            .get_mut(model)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| MockReply::text("mock response"))
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftwiseError> {
        Ok(self.health.clone())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn invoke(
        &self,
        model: &ModelDescriptor,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, DraftwiseError> {
        self.calls
            .lock()
            .await
            .push((model.name.clone(), request.prompt.clone()));

        let text = match self.next_reply(&model.name).await {
            MockReply::Text(text) => text,
            MockReply::Error(message) => {
                return Err(DraftwiseError::provider(&model.name, message));
            }
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
        };
        Ok(ProviderResponse {
            text,
            usage: self.usage,
            cost_usd: None,
            metadata: serde_json::json!({ "provider": self.name }),
        })
    }

    fn reports_usage(&self) -> bool {
        self.usage.is_some()
    }
}

#[cfg(test)]
mod tests {
    use draftwise_core::{ComplexityTier, Domain};

    use super::*;

    fn model(name: &str) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            provider: "mock".to_string(),
            input_cost_per_1k: 0.001,
            output_cost_per_1k: 0.002,
            quality: 0.8,
            latency_ms: 100,
            domains: vec![],
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            prompt: "hi".to_string(),
            domain: Domain::General,
            complexity: ComplexityTier::Trivial,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new("mock");
        let resp = provider.invoke(&model("a"), &request()).await.unwrap();
        assert_eq!(resp.text, "mock response");
        assert_eq!(resp.usage.unwrap().output_tokens, 20);
    }

    #[tokio::test]
    async fn replies_are_scripted_per_model() {
        let provider = MockProvider::new("mock")
            .with_replies("a", [MockReply::text("first"), MockReply::error("boom")])
            .with_replies("b", [MockReply::text("other")]);

        assert_eq!(provider.invoke(&model("a"), &request()).await.unwrap().text, "first");
        assert_eq!(provider.invoke(&model("b"), &request()).await.unwrap().text, "other");
        let err = provider.invoke(&model("a"), &request()).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            provider.invoke(&model("a"), &request()).await.unwrap().text,
            "mock response"
        );
        assert_eq!(provider.calls().await, vec!["a", "b", "a", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_sleeps() {
        let provider = MockProvider::new("mock")
            .with_replies("a", [MockReply::Delayed(Duration::from_secs(60), "late".into())]);
        let started = tokio::time::Instant::now();
        let resp = provider.invoke(&model("a"), &request()).await.unwrap();
        assert_eq!(resp.text, "late");
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn usage_can_be_omitted() {
        let provider = MockProvider::new("mock").without_usage();
        assert!(!provider.reports_usage());
        let resp = provider.invoke(&model("a"), &request()).await.unwrap();
        assert!(resp.usage.is_none());
    }
}
