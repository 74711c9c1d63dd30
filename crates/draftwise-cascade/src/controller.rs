// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cascade engine and its `run` entry point.
//!
//! A run classifies the query, admits it against the identity's budget,
//! drafts with the cheapest suitable model, validates the draft and either
//! accepts it or escalates to a verifier. Domains with a configured
//! [`PipelineStrategy`] run their steps instead of the flat cascade.
//!
//! Provider failures and quality failures share one path: both lead to the
//! next fallback. Only budget and configuration problems reach the caller as
//! errors; exhausted fallbacks return the last obtained text marked degraded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use draftwise_config::model::DraftwiseConfig;
use draftwise_config::validate_config;
use draftwise_core::{
    BudgetExceeded, BudgetPeriod, ComplexityTier, Domain, DomainClassifierAdapter, DraftResult,
    DraftwiseError, EmbeddingAdapter, HealthStatus, ModelDescriptor, ProviderAdapter,
    ProviderRequest, QueryContext,
};
use draftwise_cost::{AdmissionDecision, Clock, CostTracker, EnforcementAction, EnforcementHook};
use draftwise_quality::{ConfidenceEstimator, QualityScore, QualityValidator};
use draftwise_router::{
    ComplexityAnalyzer, DomainDetection, ExemplarDomainClassifier, ModelSelector,
    SelectionRequest, SemanticDomainDetector,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decision::CascadeDecision;
use crate::executor::DraftExecutor;
use crate::pipeline::{PipelineStrategy, StepEvaluation};
use crate::result::{CascadeRequest, CascadeResult, StepOutcome, StepTrace};
use crate::state::CascadeState;
use crate::threshold::ThresholdTable;

/// The cascade decision engine.
///
/// Built once from configuration and shared (usually behind an `Arc`) by
/// every concurrent query.
pub struct CascadeEngine {
    detector: SemanticDomainDetector,
    analyzer: ComplexityAnalyzer,
    selector: ModelSelector,
    validator: QualityValidator,
    estimator: ConfidenceEstimator,
    thresholds: ThresholdTable,
    executor: DraftExecutor,
    tracker: Arc<CostTracker>,
    pipelines: HashMap<Domain, PipelineStrategy>,
    verifier: Option<String>,
    domain_verifiers: HashMap<Domain, String>,
    max_retries: u32,
    degrade_fraction: f64,
}

impl std::fmt::Debug for CascadeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeEngine")
            .field("executor", &self.executor)
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CascadeEngine`]. Every configuration problem is reported by
/// [`build`](Self::build), never at query time.
pub struct CascadeEngineBuilder {
    config: DraftwiseConfig,
    providers: Vec<Arc<dyn ProviderAdapter>>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    classifier: Option<Arc<dyn DomainClassifierAdapter>>,
    tracker: Option<Arc<CostTracker>>,
    hook: Option<EnforcementHook>,
    clock: Option<Arc<dyn Clock>>,
    pipelines: Vec<PipelineStrategy>,
}

impl CascadeEngineBuilder {
    /// Register a provider adapter. Models reference it by adapter name.
    pub fn provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Embedder used for semantic alignment and, without an explicit
    /// classifier, the exemplar domain fallback.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn domain_classifier(mut self, classifier: Arc<dyn DomainClassifierAdapter>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Share an existing tracker instead of building one from the budget config.
    pub fn cost_tracker(mut self, tracker: Arc<CostTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Enforcement hook for the tracker built by this builder.
    pub fn enforcement_hook(mut self, hook: EnforcementHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Clock for the tracker built by this builder.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Add or replace the pipeline for the strategy's domain.
    pub fn pipeline(mut self, strategy: PipelineStrategy) -> Self {
        self.pipelines.push(strategy);
        self
    }

    pub fn build(self) -> Result<CascadeEngine, DraftwiseError> {
        let config = self.config;
        validate_config(&config).map_err(|errors| {
            DraftwiseError::Config(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let mut executor =
            DraftExecutor::new(Duration::from_millis(config.engine.provider_timeout_ms));
        for provider in self.providers {
            executor.register(provider);
        }
        for model in &config.models {
            if !executor.has_provider(&model.provider) {
                return Err(DraftwiseError::Config(format!(
                    "model `{}` uses provider `{}` but no adapter with that name is registered",
                    model.name, model.provider
                )));
            }
        }

        let mut pipelines: HashMap<Domain, PipelineStrategy> = config
            .pipelines
            .iter()
            .map(|(domain, p)| (*domain, PipelineStrategy::from_config(*domain, p)))
            .collect();
        for strategy in self.pipelines {
            pipelines.insert(strategy.domain, strategy);
        }
        for strategy in pipelines.values() {
            if strategy.steps.is_empty() {
                return Err(DraftwiseError::Config(format!(
                    "pipeline for domain `{}` has no steps",
                    strategy.domain
                )));
            }
            for step in &strategy.steps {
                for model in step.models() {
                    if config.model(model).is_none() {
                        return Err(DraftwiseError::Config(format!(
                            "pipeline step `{}` for domain `{}` references unknown model `{model}`",
                            step.name, strategy.domain
                        )));
                    }
                }
            }
        }

        let routing = &config.routing;
        let classifier = self.classifier.or_else(|| {
            self.embedder.as_ref().map(|e| {
                Arc::new(ExemplarDomainClassifier::new(Arc::clone(e)))
                    as Arc<dyn DomainClassifierAdapter>
            })
        });
        let detector = match (routing.semantic_fallback, classifier) {
            (true, Some(classifier)) => {
                SemanticDomainDetector::with_classifier(classifier, routing.semantic_confidence_floor)
            }
            (true, None) => {
                warn!("semantic domain fallback enabled without a classifier or embedder, using rules only");
                SemanticDomainDetector::rules_only()
            }
            (false, _) => SemanticDomainDetector::rules_only(),
        };

        let mut validator = QualityValidator::new(config.quality.clone());
        if let Some(embedder) = self.embedder {
            validator = validator.with_embedder(embedder);
        }

        let tracker = match self.tracker {
            Some(tracker) => tracker,
            None => {
                let mut tracker =
                    CostTracker::from_config(&config.budget, &config.engine.default_plan);
                if let Some(clock) = self.clock {
                    tracker = tracker.with_clock(clock);
                }
                if let Some(hook) = self.hook {
                    tracker = tracker.with_hook(hook);
                }
                Arc::new(tracker)
            }
        };

        info!(
            models = config.models.len(),
            pipelines = pipelines.len(),
            semantic_domains = detector.is_semantic(),
            "cascade engine initialized"
        );

        Ok(CascadeEngine {
            detector,
            analyzer: ComplexityAnalyzer::new(),
            selector: ModelSelector::from_config(&config),
            validator,
            estimator: ConfidenceEstimator::new(&config.confidence),
            thresholds: ThresholdTable::from_config(&config.cascade),
            executor,
            tracker,
            pipelines,
            verifier: config.cascade.verifier_model.clone(),
            domain_verifiers: config.cascade.domain_verifiers.clone(),
            max_retries: config.cascade.max_retries,
            degrade_fraction: config.budget.degrade_ceiling_fraction,
        })
    }
}

/// Quality assessment of one model output.
struct Evaluation {
    quality: QualityScore,
    confidence: f64,
    threshold: f64,
    violations: Vec<&'static str>,
}

/// Result of one budget-admitted model call.
enum Attempt {
    Done(DraftResult),
    Failed(DraftwiseError),
    Denied(BudgetExceeded),
}

/// The text a run returns and how it got there.
struct Answer {
    draft: DraftResult,
    evaluation: Evaluation,
    decision: Option<CascadeDecision>,
    degraded: bool,
    escalated: bool,
}

/// Draft candidates and the budget ceiling they were selected under.
struct Selection {
    drafts: Vec<ModelDescriptor>,
    ceiling: Option<f64>,
}

/// Per-run accumulator. Lives only for the duration of one run.
#[derive(Default)]
struct RunLog {
    trace: Vec<StepTrace>,
    models_used: Vec<String>,
    total_cost_usd: f64,
    budget_action: EnforcementAction,
}

impl RunLog {
    fn note_admission(&mut self, decision: &AdmissionDecision) {
        self.budget_action = self.budget_action.max(decision.action);
    }

    fn record(&mut self, draft: &DraftResult) {
        self.models_used.push(draft.model.clone());
        self.total_cost_usd += draft.cost_usd;
    }

    fn finish(self, ctx: &QueryContext, answer: Answer) -> CascadeResult {
        let result = CascadeResult {
            text: answer.draft.text,
            model: answer.draft.model,
            models_used: self.models_used,
            total_cost_usd: self.total_cost_usd,
            trace: self.trace,
            confidence: answer.evaluation.confidence,
            domain: ctx.domain,
            domain_confidence: ctx.domain_confidence,
            complexity: ctx.complexity,
            quality: Some(answer.evaluation.quality),
            decision: answer.decision,
            degraded: answer.degraded,
            escalated: answer.escalated,
            budget_action: self.budget_action,
        };
        if result.degraded {
            warn!(
                identity = %ctx.identity,
                domain = %ctx.domain,
                model = %result.model,
                confidence = result.confidence,
                "returning degraded result"
            );
        }
        info!(
            identity = %ctx.identity,
            domain = %ctx.domain,
            complexity = %ctx.complexity,
            model = %result.model,
            total_cost_usd = result.total_cost_usd,
            escalated = result.escalated,
            degraded = result.degraded,
            "cascade completed"
        );
        result
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), DraftwiseError> {
    if cancel.is_cancelled() {
        Err(DraftwiseError::Cancelled)
    } else {
        Ok(())
    }
}

impl CascadeEngine {
    pub fn builder(config: DraftwiseConfig) -> CascadeEngineBuilder {
        CascadeEngineBuilder {
            config,
            providers: Vec::new(),
            embedder: None,
            classifier: None,
            tracker: None,
            hook: None,
            clock: None,
            pipelines: Vec::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<CostTracker> {
        &self.tracker
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Health of every registered provider adapter.
    pub async fn health(&self) -> BTreeMap<String, HealthStatus> {
        self.executor.health().await
    }

    /// Run one query through the cascade.
    ///
    /// Cancelling `cancel` stops the run before its next state transition
    /// and drops any in-flight provider call. Cost already recorded stays
    /// recorded.
    pub async fn run(
        &self,
        request: CascadeRequest,
        cancel: CancellationToken,
    ) -> Result<CascadeResult, DraftwiseError> {
        ensure_active(&cancel)?;

        let detection = match request.domain_override {
            Some(domain) => DomainDetection {
                domain,
                confidence: 1.0,
            },
            None => self.detector.detect(&request.query).await,
        };
        let complexity = self.analyzer.analyze(&request.query, detection.domain);
        let ctx = QueryContext {
            text: request.query,
            domain: detection.domain,
            domain_confidence: detection.confidence,
            complexity,
            identity: request.identity,
            plan: request.plan,
            domain_override: request.domain_override,
        };
        debug!(
            identity = %ctx.identity,
            plan = %ctx.plan,
            domain = %ctx.domain,
            domain_confidence = ctx.domain_confidence,
            complexity = %ctx.complexity,
            "query classified"
        );

        let mut log = RunLog::default();
        let answer = match self.pipelines.get(&ctx.domain) {
            Some(pipeline) => self.run_pipeline(&ctx, pipeline, &mut log, &cancel).await?,
            None => self.run_flat(&ctx, &mut log, &cancel).await?,
        };
        Ok(log.finish(&ctx, answer))
    }

    async fn run_flat(
        &self,
        ctx: &QueryContext,
        log: &mut RunLog,
        cancel: &CancellationToken,
    ) -> Result<Answer, DraftwiseError> {
        let selection = self.candidates(ctx, log)?;
        let draft_model = &selection.drafts[0];

        let mut last_error = None;
        let mut drafted: Option<(DraftResult, Evaluation, CascadeDecision)> = None;
        match self
            .attempt(ctx, draft_model, self.max_retries, log, cancel)
            .await?
        {
            Attempt::Denied(exceeded) => return Err(exceeded.into()),
            Attempt::Failed(e) => {
                warn!(model = %draft_model.name, error = %e, "draft call failed");
                log.trace.push(StepTrace::failed(
                    "draft",
                    CascadeState::Drafted,
                    &draft_model.name,
                    StepOutcome::ProviderFailed,
                    e.to_string(),
                ));
                last_error = Some(e);
            }
            Attempt::Done(draft) => {
                ensure_active(cancel)?;
                let evaluation = self.evaluate(ctx, &draft, draft_model).await;
                let decision = CascadeDecision::decide(
                    evaluation.confidence,
                    evaluation.threshold,
                    evaluation.violations.clone(),
                );
                let outcome = if decision.accepted() {
                    StepOutcome::Accepted
                } else {
                    StepOutcome::Rejected
                };
                log.trace.push(StepTrace::completed(
                    "draft",
                    CascadeState::Validated,
                    &draft,
                    evaluation.confidence,
                    outcome,
                ));
                if decision.accepted() {
                    debug!(model = %draft.model, reason = %decision.reason, "draft accepted");
                    return Ok(Answer {
                        draft,
                        evaluation,
                        decision: Some(decision),
                        degraded: false,
                        escalated: false,
                    });
                }
                drafted = Some((draft, evaluation, decision));
            }
        }

        ensure_active(cancel)?;
        let verifiers = self.verifier_chain(ctx, draft_model, selection.ceiling, drafted.is_none());
        info!(
            identity = %ctx.identity,
            domain = %ctx.domain,
            draft_model = %draft_model.name,
            reason = drafted.as_ref().map_or("draft call failed", |(_, _, d)| d.reason.as_str()),
            verifiers = ?verifiers.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "escalating to verifier"
        );

        for verifier in &verifiers {
            match self
                .attempt(ctx, verifier, self.max_retries, log, cancel)
                .await?
            {
                Attempt::Done(answer) => {
                    ensure_active(cancel)?;
                    // The verifier is the terminal authority: scored for the
                    // report, accepted unconditionally.
                    let evaluation = self.evaluate(ctx, &answer, verifier).await;
                    log.trace.push(StepTrace::completed(
                        "verify",
                        CascadeState::Escalating,
                        &answer,
                        evaluation.confidence,
                        StepOutcome::Accepted,
                    ));
                    return Ok(Answer {
                        draft: answer,
                        evaluation,
                        decision: drafted.map(|(_, _, d)| d),
                        degraded: false,
                        escalated: true,
                    });
                }
                Attempt::Failed(e) => {
                    warn!(model = %verifier.name, error = %e, "verifier call failed, trying next");
                    log.trace.push(StepTrace::failed(
                        "verify",
                        CascadeState::Escalating,
                        &verifier.name,
                        StepOutcome::ProviderFailed,
                        e.to_string(),
                    ));
                    last_error = Some(e);
                }
                Attempt::Denied(exceeded) => {
                    log.trace.push(StepTrace::failed(
                        "verify",
                        CascadeState::Escalating,
                        &verifier.name,
                        StepOutcome::BudgetDenied,
                        exceeded.to_string(),
                    ));
                    if drafted.is_none() {
                        return Err(exceeded.into());
                    }
                    break;
                }
            }
        }

        match drafted {
            Some((draft, evaluation, decision)) => Ok(Answer {
                draft,
                evaluation,
                decision: Some(decision),
                degraded: true,
                escalated: false,
            }),
            None => Err(last_error.unwrap_or_else(|| {
                DraftwiseError::Internal("no model produced output".to_string())
            })),
        }
    }

    async fn run_pipeline(
        &self,
        ctx: &QueryContext,
        pipeline: &PipelineStrategy,
        log: &mut RunLog,
        cancel: &CancellationToken,
    ) -> Result<Answer, DraftwiseError> {
        let mut last: Option<(DraftResult, Evaluation, bool, &str)> = None;
        let mut last_error = None;
        let threshold = self.thresholds.resolve(ctx.domain, ctx.complexity);

        'steps: for (index, step) in pipeline.steps.iter().enumerate() {
            let state = CascadeState::PipelineStep(index);
            for (attempt_index, (model_name, retries)) in
                step.models().zip([step.retry_budget, 0]).enumerate()
            {
                let model = self.selector.model(model_name).ok_or_else(|| {
                    DraftwiseError::Internal(format!("unknown pipeline model `{model_name}`"))
                })?;
                let escalated = index > 0 || attempt_index > 0;

                match self.attempt(ctx, model, retries, log, cancel).await? {
                    Attempt::Done(draft) => {
                        ensure_active(cancel)?;
                        let evaluation = self.evaluate(ctx, &draft, model).await;
                        let passed = step.validator.passes(&StepEvaluation {
                            domain: ctx.domain,
                            complexity: ctx.complexity,
                            text: &draft.text,
                            quality: &evaluation.quality,
                            confidence: evaluation.confidence,
                            threshold,
                            floor_violations: &evaluation.violations,
                        });
                        log.trace.push(StepTrace::completed(
                            &step.name,
                            state,
                            &draft,
                            evaluation.confidence,
                            if passed {
                                StepOutcome::Accepted
                            } else {
                                StepOutcome::Rejected
                            },
                        ));
                        if passed {
                            debug!(step = %step.name, model = %draft.model, "pipeline step passed");
                            let decision = CascadeDecision::pipeline(
                                ctx.domain,
                                &step.name,
                                true,
                                evaluation.confidence,
                                threshold,
                                evaluation.violations.clone(),
                            );
                            return Ok(Answer {
                                draft,
                                evaluation,
                                decision: Some(decision),
                                degraded: false,
                                escalated,
                            });
                        }
                        debug!(
                            step = %step.name,
                            model = %draft.model,
                            confidence = evaluation.confidence,
                            "pipeline step output rejected"
                        );
                        last = Some((draft, evaluation, escalated, step.name.as_str()));
                    }
                    Attempt::Failed(e) => {
                        warn!(step = %step.name, model = %model.name, error = %e, "pipeline step call failed");
                        log.trace.push(StepTrace::failed(
                            &step.name,
                            state,
                            &model.name,
                            StepOutcome::ProviderFailed,
                            e.to_string(),
                        ));
                        last_error = Some(e);
                    }
                    Attempt::Denied(exceeded) => {
                        log.trace.push(StepTrace::failed(
                            &step.name,
                            state,
                            &model.name,
                            StepOutcome::BudgetDenied,
                            exceeded.to_string(),
                        ));
                        if last.is_none() {
                            return Err(exceeded.into());
                        }
                        break 'steps;
                    }
                }
            }
            ensure_active(cancel)?;
            if index + 1 < pipeline.steps.len() {
                info!(step = %step.name, domain = %ctx.domain, "pipeline step failed, escalating to next step");
            }
        }

        match last {
            Some((draft, evaluation, escalated, step)) => {
                let decision = CascadeDecision::pipeline(
                    ctx.domain,
                    step,
                    false,
                    evaluation.confidence,
                    threshold,
                    evaluation.violations.clone(),
                );
                Ok(Answer {
                    draft,
                    evaluation,
                    decision: Some(decision),
                    degraded: true,
                    escalated,
                })
            }
            None => Err(last_error.unwrap_or_else(|| {
                DraftwiseError::Internal("pipeline produced no output".to_string())
            })),
        }
    }

    /// Candidate list for the draft, re-selected under a reduced ceiling when
    /// the budget asks to degrade. Empty lists are a budget outcome.
    fn candidates(
        &self,
        ctx: &QueryContext,
        log: &mut RunLog,
    ) -> Result<Selection, DraftwiseError> {
        let remaining = self.tracker.remaining(&ctx.identity, &ctx.plan);
        let mut request = SelectionRequest {
            domain: ctx.domain,
            complexity: ctx.complexity,
            plan: &ctx.plan,
            budget_remaining: remaining,
        };
        let candidates = self.selector.select(&request);
        let Some(first) = candidates.first() else {
            return Err(self.no_candidates(ctx, remaining));
        };

        let estimate = self.selector.estimate_cost(first, ctx.complexity);
        let admission = self.tracker.can_afford(&ctx.identity, &ctx.plan, estimate);
        log.note_admission(&admission);
        if admission.action != EnforcementAction::Degrade {
            return Ok(Selection {
                drafts: candidates,
                ceiling: remaining,
            });
        }

        let ceiling = remaining.unwrap_or(estimate) * self.degrade_fraction;
        request.budget_remaining = Some(ceiling);
        let degraded = self.selector.select(&request);
        warn!(
            identity = %ctx.identity,
            ceiling_usd = ceiling,
            reason = %admission.reason,
            candidates = degraded.len(),
            "budget degrade, reselecting under reduced ceiling"
        );
        if degraded.is_empty() {
            return Err(self.no_candidates(ctx, Some(ceiling)));
        }
        Ok(Selection {
            drafts: degraded,
            ceiling: Some(ceiling),
        })
    }

    fn no_candidates(&self, ctx: &QueryContext, ceiling: Option<f64>) -> DraftwiseError {
        let cheapest = self
            .selector
            .catalog()
            .iter()
            .filter(|m| m.applies_to(ctx.domain))
            .map(|m| self.selector.estimate_cost(m, ctx.complexity))
            .fold(f64::INFINITY, f64::min);
        let requested_usd = if cheapest.is_finite() { cheapest } else { 0.0 };
        let admission = self.tracker.can_afford(&ctx.identity, &ctx.plan, requested_usd);
        let exceeded = match admission.limiting {
            Some(limiting) => BudgetExceeded {
                identity: limiting.scope,
                period: limiting.period,
                limit_usd: limiting.limit_usd,
                spent_usd: limiting.spent_usd,
                requested_usd,
                resets_at: limiting.resets_at,
            },
            None => BudgetExceeded {
                identity: ctx.identity.clone(),
                period: BudgetPeriod::Total,
                limit_usd: ceiling.unwrap_or(0.0),
                spent_usd: self.tracker.spent_by(&ctx.identity),
                requested_usd,
                resets_at: None,
            },
        };
        warn!(
            identity = %ctx.identity,
            plan = %ctx.plan,
            domain = %ctx.domain,
            complexity = %ctx.complexity,
            "no affordable candidate model"
        );
        DraftwiseError::BudgetExceeded(exceeded)
    }

    /// Verifiers in the order they are tried: the configured verifier (domain
    /// override first), then the escalation candidates affordable under
    /// `ceiling` by descending quality. After a quality failure only models
    /// rated above the draft model qualify.
    fn verifier_chain(
        &self,
        ctx: &QueryContext,
        draft_model: &ModelDescriptor,
        ceiling: Option<f64>,
        draft_failed: bool,
    ) -> Vec<ModelDescriptor> {
        let candidates = self.selector.escalation_candidates(&SelectionRequest {
            domain: ctx.domain,
            complexity: ctx.complexity,
            plan: &ctx.plan,
            budget_remaining: ceiling,
        });
        let plan = self.selector.plan(&ctx.plan);
        let mut chain: Vec<ModelDescriptor> = self
            .domain_verifiers
            .get(&ctx.domain)
            .or(self.verifier.as_ref())
            .filter(|name| **name != draft_model.name && plan.allows(name))
            .and_then(|name| self.selector.model(name))
            .cloned()
            .into_iter()
            .collect();

        let mut rest: Vec<ModelDescriptor> = candidates
            .iter()
            .filter(|m| m.name != draft_model.name && chain.iter().all(|c| c.name != m.name))
            .filter(|m| draft_failed || m.quality > draft_model.quality)
            .cloned()
            .collect();
        rest.sort_by(|a, b| {
            b.quality
                .total_cmp(&a.quality)
                .then_with(|| a.name.cmp(&b.name))
        });
        chain.extend(rest);
        chain
    }

    /// Reserve budget for one call, invoke, then settle the realized cost.
    async fn attempt(
        &self,
        ctx: &QueryContext,
        model: &ModelDescriptor,
        retries: u32,
        log: &mut RunLog,
        cancel: &CancellationToken,
    ) -> Result<Attempt, DraftwiseError> {
        ensure_active(cancel)?;
        let estimate = self.selector.estimate_cost(model, ctx.complexity);
        let (admission, reservation) = self.tracker.reserve(&ctx.identity, &ctx.plan, estimate);
        log.note_admission(&admission);
        let Some(reservation) = reservation else {
            return Ok(Attempt::Denied(self.denial(ctx, &admission)));
        };

        let request = ProviderRequest::from_context(ctx);
        match self
            .executor
            .invoke_with_retries(model, &request, retries, cancel)
            .await
        {
            Ok(draft) => {
                reservation.settle(&draft.model, draft.cost_usd, draft.usage);
                log.record(&draft);
                Ok(Attempt::Done(draft))
            }
            Err(e) if e.is_recoverable() => Ok(Attempt::Failed(e)),
            Err(e) => Err(e),
        }
    }

    fn denial(&self, ctx: &QueryContext, admission: &AdmissionDecision) -> BudgetExceeded {
        admission
            .to_budget_exceeded()
            .unwrap_or_else(|| BudgetExceeded {
                identity: ctx.identity.clone(),
                period: BudgetPeriod::Total,
                limit_usd: 0.0,
                spent_usd: self.tracker.spent_by(&ctx.identity),
                requested_usd: admission.estimate_usd,
                resets_at: None,
            })
    }

    async fn evaluate(
        &self,
        ctx: &QueryContext,
        draft: &DraftResult,
        model: &ModelDescriptor,
    ) -> Evaluation {
        let quality = self
            .validator
            .assess(&ctx.text, &draft.text, ctx.domain)
            .await;
        let confidence = self.estimator.estimate(&quality, ctx.complexity, model);
        let threshold = self.thresholds.resolve(ctx.domain, ctx.complexity);
        let violations = quality.floor_violations(&self.thresholds.floors(ctx.domain));
        Evaluation {
            quality,
            confidence,
            threshold,
            violations,
        }
    }

    /// Domain and complexity of `text` as `run` would resolve them.
    pub async fn classify(&self, text: &str) -> (DomainDetection, ComplexityTier) {
        let detection = self.detector.detect(text).await;
        let tier = self.analyzer.analyze(text, detection.domain);
        (detection, tier)
    }
}
