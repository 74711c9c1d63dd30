// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cost tracker: the only place budget state is mutated.
//!
//! Each identity owns an exclusive section (`DashMap` entry holding an
//! `Arc<Mutex<_>>`), so admission checks for one identity are serialized
//! without a process-wide lock. Global limits and the entry ledger sit behind
//! their own mutexes; admission only takes the global one when a global limit
//! is configured. Locks are always taken in the order identity → global →
//! ledger.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use draftwise_config::model::{BudgetConfig, BudgetLimits, EnforcementMode, PlanConfig};
use draftwise_core::{BudgetPeriod, TokenUsage};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::budget::{
    AdmissionDecision, BudgetState, EnforcementAction, EnforcementCheck, EnforcementHook,
    EnforcementPolicy, GLOBAL_SCOPE, LimitingBudget, Thresholds, evaluate_scope,
};
use crate::export::CostSnapshot;
use crate::reset::{CalendarResetPolicy, Clock, ResetPolicy, SystemClock};

/// One recorded model invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEntry {
    /// Unique entry identifier (UUID v4).
    pub id: String,
    pub identity: String,
    pub model: String,
    pub cost_usd: f64,
    pub usage: TokenUsage,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct IdentityBudget {
    plan: String,
    limits: BudgetLimits,
    state: BudgetState,
}

#[derive(Debug, Default)]
struct Ledger {
    entries: Vec<CostEntry>,
    total_usd: f64,
    by_identity: BTreeMap<String, f64>,
    by_model: BTreeMap<String, f64>,
}

/// Identity-keyed cost ledger and budget enforcer.
///
/// Pass it explicitly (usually behind an `Arc`) to whatever needs it; there is
/// no ambient instance.
pub struct CostTracker {
    identities: DashMap<String, Arc<Mutex<IdentityBudget>>>,
    global: Mutex<BudgetState>,
    global_limits: BudgetLimits,
    ledger: Mutex<Ledger>,
    plans: HashMap<String, PlanConfig>,
    identity_limits: HashMap<String, BudgetLimits>,
    default_plan: String,
    policy: EnforcementPolicy,
    clock: Arc<dyn Clock>,
    reset: Arc<dyn ResetPolicy>,
}

impl std::fmt::Debug for CostTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostTracker")
            .field("identities", &self.identities.len())
            .field("default_plan", &self.default_plan)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CostTracker {
    /// Build a tracker from the budget section of the configuration.
    pub fn from_config(config: &BudgetConfig, default_plan: &str) -> Self {
        Self {
            identities: DashMap::new(),
            global: Mutex::new(BudgetState::new()),
            global_limits: config.global,
            ledger: Mutex::new(Ledger::default()),
            plans: config.plans.clone(),
            identity_limits: config.identities.clone(),
            default_plan: default_plan.to_string(),
            policy: EnforcementPolicy {
                thresholds: Thresholds::from_config(config),
                mode: config.enforcement,
                hook: None,
            },
            clock: Arc::new(SystemClock),
            reset: Arc::new(CalendarResetPolicy),
        }
    }

    /// Replace the time source (tests and simulations).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the window reset policy.
    pub fn with_reset_policy(mut self, reset: Arc<dyn ResetPolicy>) -> Self {
        self.reset = reset;
        self
    }

    /// Install a host enforcement hook that may override every computed action.
    pub fn with_hook(mut self, hook: EnforcementHook) -> Self {
        self.policy.hook = Some(hook);
        self
    }

    pub fn enforcement_mode(&self) -> EnforcementMode {
        self.policy.mode
    }

    /// Check admission for a call estimated at `estimate_usd` without reserving it.
    pub fn can_afford(&self, identity: &str, plan: &str, estimate_usd: f64) -> AdmissionDecision {
        self.admit(identity, plan, estimate_usd, false)
    }

    /// Check admission and, when allowed, reserve the estimate until the
    /// returned guard is settled or dropped.
    ///
    /// The check and the reservation happen inside the identity's exclusive
    /// section, so two concurrent requests cannot both pass a check that only
    /// one of them should pass.
    pub fn reserve(
        &self,
        identity: &str,
        plan: &str,
        estimate_usd: f64,
    ) -> (AdmissionDecision, Option<BudgetReservation<'_>>) {
        let decision = self.admit(identity, plan, estimate_usd, true);
        let reservation = decision.allowed.then(|| BudgetReservation {
            tracker: self,
            identity: identity.to_string(),
            estimate_usd: estimate_usd.max(0.0),
            open: true,
        });
        (decision, reservation)
    }

    /// Record realized spend for `identity`.
    pub fn record(
        &self,
        identity: &str,
        model: &str,
        cost_usd: f64,
        usage: TokenUsage,
    ) -> CostEntry {
        self.record_inner(identity, model, cost_usd, usage, 0.0)
    }

    /// Headroom left before the strongest limit would block, across the
    /// identity's and the global limits. `None` when nothing is limited.
    pub fn remaining(&self, identity: &str, plan: &str) -> Option<f64> {
        let slot = self.slot(identity, plan);
        let mut budget = lock(&slot);
        let now = self.clock.now();
        self.refresh(identity, &mut budget, plan, now);
        let global = self.global_section(now);

        let block_at = self.policy.thresholds.block_at;
        let headroom = |state: &BudgetState, limits: &BudgetLimits| {
            BudgetPeriod::iter()
                .filter_map(|p| {
                    limits
                        .limit(p)
                        .map(|l| l * block_at - state.spent(p) - state.reserved_usd)
                })
                .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.min(h))))
        };
        match (
            headroom(&budget.state, &budget.limits),
            global
                .as_deref()
                .and_then(|state| headroom(state, &self.global_limits)),
        ) {
            (Some(a), Some(b)) => Some(a.min(b).max(0.0)),
            (Some(a), None) | (None, Some(a)) => Some(a.max(0.0)),
            (None, None) => None,
        }
    }

    /// Copy of an identity's budget state, if it has been seen.
    pub fn budget_state(&self, identity: &str) -> Option<BudgetState> {
        let slot = self.identities.get(identity).map(|e| Arc::clone(e.value()))?;
        let state = lock(&slot).state.clone();
        Some(state)
    }

    pub fn global_state(&self) -> BudgetState {
        lock(&self.global).clone()
    }

    /// Recorded spend for one identity across all time.
    pub fn spent_by(&self, identity: &str) -> f64 {
        lock(&self.ledger)
            .by_identity
            .get(identity)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_usd(&self) -> f64 {
        lock(&self.ledger).total_usd
    }

    /// Read-only copy of the entry log and aggregates.
    pub fn snapshot(&self) -> CostSnapshot {
        let ledger = lock(&self.ledger);
        CostSnapshot {
            entries: ledger.entries.clone(),
            total_usd: ledger.total_usd,
            by_identity: ledger.by_identity.clone(),
            by_model: ledger.by_model.clone(),
            taken_at: self.clock.now(),
        }
    }

    fn limits_for(&self, identity: &str, plan: &str) -> BudgetLimits {
        if let Some(limits) = self.identity_limits.get(identity) {
            return *limits;
        }
        self.plans
            .get(plan)
            .or_else(|| self.plans.get(&self.default_plan))
            .map(PlanConfig::limits)
            .unwrap_or_default()
    }

    fn slot(&self, identity: &str, plan: &str) -> Arc<Mutex<IdentityBudget>> {
        // Clone the Arc out so the shard lock is released before the mutex is taken.
        let entry = self
            .identities
            .entry(identity.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IdentityBudget {
                    plan: plan.to_string(),
                    limits: self.limits_for(identity, plan),
                    state: BudgetState::new(),
                }))
            });
        Arc::clone(entry.value())
    }

    fn refresh(
        &self,
        identity: &str,
        budget: &mut IdentityBudget,
        plan: &str,
        now: DateTime<Utc>,
    ) {
        if budget.plan != plan {
            budget.plan = plan.to_string();
            budget.limits = self.limits_for(identity, plan);
        }
        budget.state.roll(self.reset.as_ref(), now);
    }

    fn admit(
        &self,
        identity: &str,
        plan: &str,
        estimate_usd: f64,
        reserve: bool,
    ) -> AdmissionDecision {
        let estimate_usd = estimate_usd.max(0.0);
        let slot = self.slot(identity, plan);
        let mut budget = lock(&slot);
        let now = self.clock.now();
        self.refresh(identity, &mut budget, plan, now);
        let mut global = self.global_section(now);

        let thresholds = &self.policy.thresholds;
        let reset = self.reset.as_ref();
        let (own_action, own_limit) = evaluate_scope(
            identity,
            &budget.state,
            &budget.limits,
            thresholds,
            estimate_usd,
            reset,
            now,
        );
        let (global_action, global_limit) = match global.as_deref() {
            Some(state) => evaluate_scope(
                GLOBAL_SCOPE,
                state,
                &self.global_limits,
                thresholds,
                estimate_usd,
                reset,
                now,
            ),
            None => (EnforcementAction::Allow, None),
        };
        let global_wins =
            global_action > own_action || (own_limit.is_none() && global_limit.is_some());
        let (computed, limiting, scope_reserved) = match global.as_deref() {
            Some(state) if global_wins => (global_action, global_limit, state.reserved_usd),
            _ => (own_action, own_limit, budget.state.reserved_usd),
        };

        let mut action = computed;
        if let Some(hook) = &self.policy.hook {
            let check = EnforcementCheck {
                scope: limiting
                    .as_ref()
                    .map_or_else(|| identity.to_string(), |l| l.scope.clone()),
                identity: identity.to_string(),
                plan: plan.to_string(),
                period: limiting.as_ref().map(|l| l.period),
                limit_usd: limiting.as_ref().map(|l| l.limit_usd),
                spent_usd: limiting.as_ref().map_or(0.0, |l| l.spent_usd),
                reserved_usd: scope_reserved,
                estimate_usd,
                action: computed,
            };
            action = hook(&check);
            if action != computed {
                debug!(%identity, %computed, overridden = %action, "enforcement hook override");
            }
        }

        action = match self.policy.mode {
            EnforcementMode::Strict => action,
            EnforcementMode::Soft if action == EnforcementAction::Block => {
                warn!(
                    %identity,
                    estimate_usd,
                    "budget limit exceeded, allowing under soft enforcement"
                );
                EnforcementAction::Warn
            }
            EnforcementMode::Soft => action,
            EnforcementMode::Disabled => EnforcementAction::Allow,
        };

        let allowed = action != EnforcementAction::Block;
        if allowed && reserve {
            budget.state.reserved_usd += estimate_usd;
            if let Some(global) = global.as_mut() {
                global.reserved_usd += estimate_usd;
            }
        }

        let reason = describe(action, computed, limiting.as_ref());
        if allowed {
            debug!(%identity, %plan, %action, estimate_usd, "budget admission");
        } else {
            warn!(%identity, %plan, estimate_usd, reason = %reason, "budget admission denied");
        }

        AdmissionDecision {
            allowed,
            action,
            reason,
            limiting,
            estimate_usd,
        }
    }

    fn release(&self, identity: &str, estimate_usd: f64) {
        let Some(slot) = self.identities.get(identity).map(|e| Arc::clone(e.value())) else {
            return;
        };
        let mut budget = lock(&slot);
        budget.state.reserved_usd = unreserve(budget.state.reserved_usd, estimate_usd);
        if !self.global_limits.is_unlimited() {
            let mut global = lock(&self.global);
            global.reserved_usd = unreserve(global.reserved_usd, estimate_usd);
        }
    }

    /// The global budget section, rolled to `now`. `None` when no global
    /// limit is configured, so unrelated identities never contend on it.
    fn global_section(&self, now: DateTime<Utc>) -> Option<MutexGuard<'_, BudgetState>> {
        if self.global_limits.is_unlimited() {
            return None;
        }
        let mut global = lock(&self.global);
        global.roll(self.reset.as_ref(), now);
        Some(global)
    }

    fn record_inner(
        &self,
        identity: &str,
        model: &str,
        cost_usd: f64,
        usage: TokenUsage,
        release_usd: f64,
    ) -> CostEntry {
        let cost_usd = if cost_usd.is_finite() { cost_usd.max(0.0) } else { 0.0 };
        // Identities first seen here are billed under the default plan.
        let slot = self.slot(identity, &self.default_plan);
        let mut budget = lock(&slot);
        let now = self.clock.now();
        budget.state.roll(self.reset.as_ref(), now);
        budget.state.reserved_usd = unreserve(budget.state.reserved_usd, release_usd);
        budget.state.add_spend(cost_usd);
        let limits = budget.limits;
        let raised = budget.state.raise_flags(&limits, &self.policy.thresholds);

        let mut global = lock(&self.global);
        global.roll(self.reset.as_ref(), now);
        global.reserved_usd = unreserve(global.reserved_usd, release_usd);
        global.add_spend(cost_usd);
        let global_raised = global.raise_flags(&self.global_limits, &self.policy.thresholds);

        let entry = CostEntry {
            id: uuid::Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            model: model.to_string(),
            cost_usd,
            usage,
            recorded_at: now,
        };
        {
            let mut ledger = lock(&self.ledger);
            ledger.total_usd += cost_usd;
            *ledger.by_identity.entry(identity.to_string()).or_insert(0.0) += cost_usd;
            *ledger.by_model.entry(model.to_string()).or_insert(0.0) += cost_usd;
            ledger.entries.push(entry.clone());
        }

        info!(
            %identity,
            %model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_usd,
            "cost recorded"
        );
        for (period, action) in raised {
            log_raised(identity, period, action, &budget.state, &limits);
        }
        for (period, action) in global_raised {
            log_raised(GLOBAL_SCOPE, period, action, &global, &self.global_limits);
        }

        entry
    }
}

fn log_raised(
    scope: &str,
    period: BudgetPeriod,
    action: EnforcementAction,
    state: &BudgetState,
    limits: &BudgetLimits,
) {
    let spent_usd = state.spent(period);
    let limit_usd = limits.limit(period).unwrap_or(0.0);
    match action {
        EnforcementAction::Block => {
            warn!(scope, %period, spent_usd, limit_usd, "budget limit exceeded");
        }
        _ => {
            warn!(scope, %period, %action, spent_usd, limit_usd, "approaching budget limit");
        }
    }
}

fn describe(
    action: EnforcementAction,
    computed: EnforcementAction,
    limiting: Option<&LimitingBudget>,
) -> String {
    let Some(l) = limiting else {
        return match action {
            EnforcementAction::Allow => "no budget limits apply".to_string(),
            other => format!("enforcement hook returned {other}"),
        };
    };
    let pct = if l.limit_usd > 0.0 {
        l.projected_usd / l.limit_usd * 100.0
    } else {
        100.0
    };
    let base = format!(
        "{} budget for `{}`: projected ${:.4} of ${:.4} ({pct:.0}%)",
        l.period, l.scope, l.projected_usd, l.limit_usd
    );
    if action == computed {
        format!("{action}: {base}")
    } else {
        format!("{action} (computed {computed}): {base}")
    }
}

/// Subtract a released estimate, snapping float residue to zero.
fn unreserve(reserved: f64, amount: f64) -> f64 {
    let left = reserved - amount;
    if left < 1e-12 { 0.0 } else { left }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// An admitted estimate held against an identity's budget.
///
/// Settle it with the realized cost once the call returns. Dropping it
/// unsettled (failed or cancelled call) releases the estimate without
/// recording spend.
#[must_use = "dropping a reservation releases it immediately"]
#[derive(Debug)]
pub struct BudgetReservation<'a> {
    tracker: &'a CostTracker,
    identity: String,
    estimate_usd: f64,
    open: bool,
}

impl BudgetReservation<'_> {
    pub fn estimate_usd(&self) -> f64 {
        self.estimate_usd
    }

    /// Replace the reservation with the realized cost.
    pub fn settle(mut self, model: &str, cost_usd: f64, usage: TokenUsage) -> CostEntry {
        self.open = false;
        self.tracker
            .record_inner(&self.identity, model, cost_usd, usage, self.estimate_usd)
    }
}

impl Drop for BudgetReservation<'_> {
    fn drop(&mut self) {
        if self.open {
            self.tracker.release(&self.identity, self.estimate_usd);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use chrono::TimeZone;
    use tracing_test::traced_test;

    use super::*;
    use crate::reset::ManualClock;

    fn config(daily: f64) -> BudgetConfig {
        BudgetConfig {
            plans: HashMap::from([(
                "free".to_string(),
                PlanConfig {
                    daily_usd: Some(daily),
                    ..PlanConfig::default()
                },
            )]),
            ..BudgetConfig::default()
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn blocked_request_records_nothing() {
        let tracker = CostTracker::from_config(&config(0.10), "free");
        tracker.record("alice", "gpt-4o-mini", 0.095, TokenUsage::default());

        let decision = tracker.can_afford("alice", "free", 0.02);
        assert!(!decision.allowed);
        assert_eq!(decision.action, EnforcementAction::Block);
        assert!(decision.reason.contains("daily"), "got: {}", decision.reason);
        assert_eq!(tracker.snapshot().entries.len(), 1);

        let (decision, reservation) = tracker.reserve("alice", "free", 0.02);
        assert!(!decision.allowed);
        assert!(reservation.is_none());
        assert_eq!(tracker.budget_state("alice").unwrap().reserved_usd, 0.0);
    }

    #[test]
    fn concurrent_reservations_cannot_both_pass() {
        let tracker = CostTracker::from_config(&config(0.10), "free");
        let barrier = Barrier::new(2);
        let admitted: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        let (decision, reservation) = tracker.reserve("bob", "free", 0.06);
                        barrier.wait();
                        drop(reservation);
                        decision.allowed
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(admitted.iter().filter(|a| **a).count(), 1);
        assert_eq!(tracker.budget_state("bob").unwrap().reserved_usd, 0.0);
    }

    #[test]
    fn settling_replaces_estimate_with_cost() {
        let tracker = CostTracker::from_config(&config(1.0), "free");
        let (decision, reservation) = tracker.reserve("carol", "free", 0.2);
        assert!(decision.allowed);
        assert!((tracker.budget_state("carol").unwrap().reserved_usd - 0.2).abs() < 1e-12);

        let entry = reservation.unwrap().settle("m", 0.05, TokenUsage::default());
        assert_eq!(entry.identity, "carol");
        let state = tracker.budget_state("carol").unwrap();
        assert_eq!(state.reserved_usd, 0.0);
        assert!((state.spent(BudgetPeriod::Daily) - 0.05).abs() < 1e-12);
        assert!((tracker.global_state().cumulative_usd - 0.05).abs() < 1e-12);
    }

    #[test]
    fn remaining_takes_tightest_scope() {
        let mut cfg = config(1.0);
        cfg.global.daily_usd = Some(0.5);
        let tracker = CostTracker::from_config(&cfg, "free");
        tracker.record("dave", "m", 0.1, TokenUsage::default());
        let remaining = tracker.remaining("dave", "free").unwrap();
        assert!((remaining - 0.4).abs() < 1e-12, "got {remaining}");

        let unlimited = CostTracker::from_config(
            &BudgetConfig {
                plans: HashMap::new(),
                ..BudgetConfig::default()
            },
            "free",
        );
        assert_eq!(unlimited.remaining("erin", "free"), None);
    }

    #[test]
    fn global_limit_blocks_every_identity() {
        let mut cfg = config(10.0);
        cfg.global.daily_usd = Some(0.10);
        let tracker = CostTracker::from_config(&cfg, "free");
        tracker.record("a", "m", 0.09, TokenUsage::default());
        let decision = tracker.can_afford("b", "free", 0.05);
        assert!(!decision.allowed);
        assert_eq!(decision.limiting.as_ref().unwrap().scope, GLOBAL_SCOPE);
        let err = decision.to_budget_exceeded().unwrap();
        assert_eq!(err.identity, "*");
    }

    #[test]
    fn admission_skips_global_section_without_global_limits() {
        let tracker = Arc::new(CostTracker::from_config(&config(1.0), "free"));
        let held = lock(&tracker.global);

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&tracker);
        std::thread::spawn(move || {
            let remaining = worker.remaining("pat", "free");
            let (decision, reservation) = worker.reserve("pat", "free", 0.2);
            drop(reservation);
            let _ = tx.send((remaining, decision.allowed));
        });

        let (remaining, allowed) = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("admission waited on the global section");
        drop(held);
        assert_eq!(remaining, Some(1.0));
        assert!(allowed);
        assert_eq!(tracker.global_state().reserved_usd, 0.0);
    }

    #[test]
    fn global_limit_reserves_in_global_section() {
        let mut cfg = config(10.0);
        cfg.global.daily_usd = Some(1.0);
        let tracker = CostTracker::from_config(&cfg, "free");
        let (_, reservation) = tracker.reserve("quinn", "free", 0.3);
        assert!((tracker.global_state().reserved_usd - 0.3).abs() < 1e-12);
        drop(reservation);
        assert_eq!(tracker.global_state().reserved_usd, 0.0);
    }

    #[test]
    fn identity_override_beats_plan() {
        let mut cfg = config(10.0);
        cfg.identities.insert(
            "vip".into(),
            BudgetLimits {
                daily_usd: Some(0.01),
                ..BudgetLimits::default()
            },
        );
        let tracker = CostTracker::from_config(&cfg, "free");
        assert!(!tracker.can_afford("vip", "free", 0.02).allowed);
        assert!(tracker.can_afford("other", "free", 0.02).allowed);
    }

    #[test]
    fn unknown_plan_uses_default_plan_limits() {
        let tracker = CostTracker::from_config(&config(0.10), "free");
        assert!(!tracker.can_afford("frank", "enterprise", 0.5).allowed);
    }

    #[test]
    fn soft_mode_downgrades_block_to_warn() {
        let mut cfg = config(0.10);
        cfg.enforcement = EnforcementMode::Soft;
        let tracker = CostTracker::from_config(&cfg, "free");
        let decision = tracker.can_afford("gina", "free", 0.5);
        assert!(decision.allowed);
        assert_eq!(decision.action, EnforcementAction::Warn);
    }

    #[test]
    fn disabled_mode_allows_but_still_tracks() {
        let mut cfg = config(0.10);
        cfg.enforcement = EnforcementMode::Disabled;
        let tracker = CostTracker::from_config(&cfg, "free");
        let decision = tracker.can_afford("hank", "free", 5.0);
        assert!(decision.allowed);
        assert_eq!(decision.action, EnforcementAction::Allow);
        tracker.record("hank", "m", 5.0, TokenUsage::default());
        assert_eq!(tracker.spent_by("hank"), 5.0);
    }

    #[test]
    fn hook_overrides_computed_action() {
        let tracker = CostTracker::from_config(&config(10.0), "free").with_hook(Arc::new(
            |check: &EnforcementCheck| {
                if check.identity == "delinquent" {
                    EnforcementAction::Block
                } else {
                    check.action
                }
            },
        ));
        let denied = tracker.can_afford("delinquent", "free", 0.01);
        assert!(!denied.allowed);
        assert!(denied.reason.contains("computed allow"), "got: {}", denied.reason);
        assert!(tracker.can_afford("ivy", "free", 0.01).allowed);
    }

    #[test]
    fn degrade_band_is_reported() {
        let tracker = CostTracker::from_config(&config(1.0), "free");
        tracker.record("jay", "m", 0.85, TokenUsage::default());
        let decision = tracker.can_afford("jay", "free", 0.07);
        assert!(decision.allowed);
        assert_eq!(decision.action, EnforcementAction::Degrade);
    }

    #[test]
    fn flags_reset_with_window() {
        let clock = clock();
        let tracker = CostTracker::from_config(&config(1.0), "free").with_clock(clock.clone());
        tracker.record("kim", "m", 1.5, TokenUsage::default());
        assert!(tracker.budget_state("kim").unwrap().flags(BudgetPeriod::Daily).blocked);
        assert!(!tracker.can_afford("kim", "free", 0.0).allowed);

        clock.advance(chrono::Duration::days(1));
        assert!(tracker.can_afford("kim", "free", 0.1).allowed);
        let state = tracker.budget_state("kim").unwrap();
        assert_eq!(state.spent(BudgetPeriod::Daily), 0.0);
        assert!((state.cumulative_usd - 1.5).abs() < 1e-12);
        // Sunk cost stays in the ledger.
        assert_eq!(tracker.spent_by("kim"), 1.5);
    }

    #[test]
    fn dropped_reservation_is_released() {
        let tracker = CostTracker::from_config(&config(1.0), "free");
        {
            let (_, reservation) = tracker.reserve("lee", "free", 0.3);
            assert!(reservation.is_some());
        }
        assert_eq!(tracker.budget_state("lee").unwrap().reserved_usd, 0.0);
        assert_eq!(tracker.global_state().reserved_usd, 0.0);
        assert!(tracker.snapshot().entries.is_empty());
    }

    #[test]
    #[traced_test]
    fn threshold_crossings_are_logged() {
        let tracker = CostTracker::from_config(&config(1.0), "free");
        tracker.record("mo", "gpt-4o-mini", 0.85, TokenUsage::default());
        assert!(logs_contain("cost recorded"));
        assert!(logs_contain("approaching budget limit"));

        tracker.record("mo", "gpt-4o-mini", 0.5, TokenUsage::default());
        assert!(logs_contain("budget limit exceeded"));
    }
}
