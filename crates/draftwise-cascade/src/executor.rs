// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider invocation with timeouts, cancellation and retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use draftwise_core::{
    DraftResult, DraftwiseError, HealthStatus, ModelDescriptor, ProviderAdapter, ProviderRequest,
};
use draftwise_cost::pricing;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Dispatches model calls to provider adapters keyed by provider name.
///
/// Every call carries the configured timeout. Cancellation drops the in-flight
/// call immediately; no partially received draft is ever returned.
#[derive(Clone)]
pub struct DraftExecutor {
    providers: BTreeMap<String, Arc<dyn ProviderAdapter>>,
    timeout: Duration,
}

impl std::fmt::Debug for DraftExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftExecutor")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DraftExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: BTreeMap::new(),
            timeout,
        }
    }

    /// Register a provider under its adapter name. Replaces any earlier one.
    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Health of every registered provider, keyed by provider name.
    pub async fn health(&self) -> BTreeMap<String, HealthStatus> {
        let mut report = BTreeMap::new();
        for (name, provider) in &self.providers {
            let status = match provider.health_check().await {
                Ok(status) => status,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            };
            report.insert(name.clone(), status);
        }
        report
    }

    /// One provider call.
    pub async fn invoke(
        &self,
        model: &ModelDescriptor,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<DraftResult, DraftwiseError> {
        let provider = self.providers.get(&model.provider).ok_or_else(|| {
            DraftwiseError::Internal(format!(
                "no provider `{}` registered for model `{}`",
                model.provider, model.name
            ))
        })?;

        let started = Instant::now();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DraftwiseError::Cancelled),
            result = tokio::time::timeout(self.timeout, provider.invoke(model, request)) => {
                match result {
                    Ok(response) => response?,
                    Err(_) => {
                        return Err(DraftwiseError::Timeout {
                            model: model.name.clone(),
                            duration: self.timeout,
                        });
                    }
                }
            }
        };
        let latency = started.elapsed();
        let (usage, cost_usd) = pricing::settle(model, &request.prompt, &response);

        debug!(
            model = %model.name,
            latency_ms = latency.as_millis() as u64,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_usd,
            "provider call completed"
        );

        Ok(DraftResult {
            text: response.text,
            usage,
            cost_usd,
            model: model.name.clone(),
            latency,
            metadata: response.metadata,
        })
    }

    /// Provider call retried up to `retries` times on recoverable failures.
    pub async fn invoke_with_retries(
        &self,
        model: &ModelDescriptor,
        request: &ProviderRequest,
        retries: u32,
        cancel: &CancellationToken,
    ) -> Result<DraftResult, DraftwiseError> {
        let mut attempt = 0;
        loop {
            match self.invoke(model, request, cancel).await {
                Err(e) if e.is_recoverable() && attempt < retries => {
                    attempt += 1;
                    warn!(
                        model = %model.name,
                        attempt,
                        retries,
                        error = %e,
                        "provider call failed, retrying"
                    );
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use draftwise_core::{
        AdapterType, ComplexityTier, Domain, PluginAdapter, ProviderResponse, TokenUsage,
    };

    use super::*;

    /// Fails `failures` times, then answers. Sleeps `delay` before every reply.
    struct Flaky {
        failures: u32,
        delay: Duration,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32, delay: Duration) -> Self {
            Self {
                failures,
                delay,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PluginAdapter for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
    }

    #[async_trait]
    impl ProviderAdapter for Flaky {
        async fn invoke(
            &self,
            model: &ModelDescriptor,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, DraftwiseError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(DraftwiseError::provider(&model.name, "503 service unavailable"));
            }
            Ok(ProviderResponse {
                text: "ok".into(),
                usage: Some(TokenUsage {
                    input_tokens: 1_000,
                    output_tokens: 1_000,
                }),
                cost_usd: None,
                metadata: serde_json::json!({ "attempt": call }),
            })
        }
    }

    fn model() -> ModelDescriptor {
        ModelDescriptor {
            name: "cheap".into(),
            provider: "flaky".into(),
            input_cost_per_1k: 0.001,
            output_cost_per_1k: 0.002,
            quality: 0.7,
            latency_ms: 100,
            domains: vec![],
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            prompt: "hello".into(),
            domain: Domain::General,
            complexity: ComplexityTier::Trivial,
        }
    }

    fn executor(provider: Arc<Flaky>, timeout: Duration) -> DraftExecutor {
        let mut executor = DraftExecutor::new(timeout);
        executor.register(provider);
        executor
    }

    #[tokio::test]
    async fn computes_cost_from_usage() {
        let executor = executor(Arc::new(Flaky::new(0, Duration::ZERO)), Duration::from_secs(1));
        let draft = executor
            .invoke(&model(), &request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(draft.text, "ok");
        assert!((draft.cost_usd - 0.003).abs() < 1e-12);
        assert_eq!(draft.metadata["attempt"], 0);
    }

    #[tokio::test]
    async fn retries_recoverable_failures() {
        let provider = Arc::new(Flaky::new(2, Duration::ZERO));
        let executor = executor(Arc::clone(&provider), Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let err = executor
            .invoke_with_retries(&model(), &request(), 1, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());

        let draft = executor
            .invoke_with_retries(&model(), &request(), 1, &cancel)
            .await
            .unwrap();
        assert_eq!(draft.text, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let executor = executor(
            Arc::new(Flaky::new(0, Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        let err = executor
            .invoke(&model(), &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwiseError::Timeout { ref model, .. } if model == "cheap"));
    }

    #[tokio::test]
    async fn cancellation_drops_in_flight_call() {
        let executor = executor(
            Arc::new(Flaky::new(0, Duration::from_secs(5))),
            Duration::from_secs(10),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = executor
            .invoke(&model(), &request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwiseError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn unknown_provider_is_internal_error() {
        let executor = DraftExecutor::new(Duration::from_secs(1));
        let err = executor
            .invoke(&model(), &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwiseError::Internal(_)));
        assert!(executor.health().await.is_empty());
    }
}
