// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete cascade engine with one
//! [`MockProvider`] per provider named in the model catalog and a manual
//! clock driving the budget windows. Provides `run()` to drive the full
//! cascade in tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use draftwise_cascade::{CascadeEngine, CascadeRequest, CascadeResult, PipelineStrategy};
use draftwise_config::model::DraftwiseConfig;
use draftwise_core::{DraftwiseError, EmbeddingAdapter, ProviderAdapter};
use draftwise_cost::{Clock, CostTracker, EnforcementHook, ManualClock};
use tokio_util::sync::CancellationToken;

use crate::mock_provider::{MockProvider, MockReply};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: DraftwiseConfig,
    replies: Vec<(String, MockReply)>,
    pipelines: Vec<PipelineStrategy>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    hook: Option<EnforcementHook>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: DraftwiseConfig::default(),
            replies: Vec::new(),
            pipelines: Vec::new(),
            embedder: None,
            hook: None,
        }
    }

    /// Start from a custom configuration.
    pub fn with_config(mut self, config: DraftwiseConfig) -> Self {
        self.config = config;
        self
    }

    /// Set every confidence threshold to `value` and drop the domain floors.
    pub fn with_threshold(mut self, value: f64) -> Self {
        let cascade = &mut self.config.cascade;
        cascade.global_threshold = value;
        for threshold in cascade.tier_thresholds.values_mut() {
            *threshold = value;
        }
        cascade.domain_thresholds.clear();
        cascade.domain_floors.clear();
        self
    }

    /// Queue a reply for `model` on whichever mock provider serves it.
    pub fn with_reply(mut self, model: &str, reply: MockReply) -> Self {
        self.replies.push((model.to_string(), reply));
        self
    }

    /// Set the daily budget of `plan`.
    pub fn with_daily_budget(mut self, plan: &str, daily_usd: f64) -> Self {
        self.config
            .budget
            .plans
            .entry(plan.to_string())
            .or_default()
            .daily_usd = Some(daily_usd);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineStrategy) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_hook(mut self, hook: EnforcementHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub fn build(self) -> Result<TestHarness, DraftwiseError> {
        let mut providers: BTreeMap<String, MockProvider> = self
            .config
            .models
            .iter()
            .map(|m| (m.provider.clone(), MockProvider::new(m.provider.clone())))
            .collect();
        for (model, reply) in self.replies {
            let provider = self
                .config
                .model(&model)
                .map(|m| m.provider.clone())
                .ok_or_else(|| DraftwiseError::Config(format!("unknown model `{model}`")))?;
            if let Some(mock) = providers.remove(&provider) {
                providers.insert(provider, mock.with_replies(&model, [reply]));
            }
        }
        let providers: BTreeMap<String, Arc<MockProvider>> = providers
            .into_iter()
            .map(|(name, mock)| (name, Arc::new(mock)))
            .collect();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut tracker =
            CostTracker::from_config(&self.config.budget, &self.config.engine.default_plan)
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        if let Some(hook) = self.hook {
            tracker = tracker.with_hook(hook);
        }
        let tracker = Arc::new(tracker);

        let mut builder = CascadeEngine::builder(self.config).cost_tracker(Arc::clone(&tracker));
        for provider in providers.values() {
            builder = builder.provider(Arc::clone(provider) as Arc<dyn ProviderAdapter>);
        }
        for pipeline in self.pipelines {
            builder = builder.pipeline(pipeline);
        }
        if let Some(embedder) = self.embedder {
            builder = builder.embedder(embedder);
        }

        Ok(TestHarness {
            engine: builder.build()?,
            providers,
            tracker,
            clock,
        })
    }
}

/// A complete test environment: engine, mock providers, tracker, and clock.
pub struct TestHarness {
    /// The engine under test.
    pub engine: CascadeEngine,
    /// Mock providers keyed by provider name.
    pub providers: BTreeMap<String, Arc<MockProvider>>,
    /// Cost tracker shared with the engine.
    pub tracker: Arc<CostTracker>,
    /// Clock driving budget windows.
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Mock provider registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics when no model in the catalog uses that provider.
    pub fn provider(&self, name: &str) -> &MockProvider {
        match self.providers.get(name) {
            Some(provider) => provider,
            None => panic!("no mock provider named `{name}`"),
        }
    }

    /// Run `query` for `identity` on `plan` with a fresh cancellation token.
    pub async fn run(
        &self,
        query: &str,
        identity: &str,
        plan: &str,
    ) -> Result<CascadeResult, DraftwiseError> {
        self.engine
            .run(
                CascadeRequest::new(query, identity, plan),
                CancellationToken::new(),
            )
            .await
    }

    /// Models invoked across every provider, sorted.
    pub async fn all_calls(&self) -> Vec<String> {
        let mut calls = Vec::new();
        for provider in self.providers.values() {
            calls.extend(provider.calls().await);
        }
        calls.sort();
        calls
    }
}
