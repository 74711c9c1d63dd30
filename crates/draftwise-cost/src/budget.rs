// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget state and the enforcement policy.
//!
//! A [`BudgetState`] keeps running spend and raised flags per tracking window
//! for one identity (or the global scope). Admission compares the projected
//! spend (spent + outstanding reservations + estimate) against each configured
//! limit: warn at `warn_at`, degrade at `degrade_at`, block once the projection
//! exceeds `block_at`. Flags raised by recorded spend are sticky until the
//! window resets.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use draftwise_config::model::{BudgetConfig, BudgetLimits, EnforcementMode};
use draftwise_core::{BudgetExceeded, BudgetPeriod};
use serde::Serialize;
use strum::{Display, EnumString, IntoEnumIterator};

use crate::reset::ResetPolicy;

/// Identity label used for the global budget scope.
pub const GLOBAL_SCOPE: &str = "*";

/// Outcome of an admission check, ordered by severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnforcementAction {
    #[default]
    Allow,
    Warn,
    Degrade,
    Block,
}

/// Flags already raised in one window. Never cleared until the window resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetFlags {
    pub warned: bool,
    pub degraded: bool,
    pub blocked: bool,
}

impl BudgetFlags {
    /// Strongest action implied by the raised flags.
    pub fn floor(&self) -> EnforcementAction {
        if self.blocked {
            EnforcementAction::Block
        } else if self.degraded {
            EnforcementAction::Degrade
        } else if self.warned {
            EnforcementAction::Warn
        } else {
            EnforcementAction::Allow
        }
    }

    /// Raise the flag for `action`. Returns `true` if it was not raised before.
    fn raise(&mut self, action: EnforcementAction) -> bool {
        let flag = match action {
            EnforcementAction::Allow => return false,
            EnforcementAction::Warn => &mut self.warned,
            EnforcementAction::Degrade => &mut self.degraded,
            EnforcementAction::Block => &mut self.blocked,
        };
        !std::mem::replace(flag, true)
    }
}

/// Spend and flags for one tracking window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowState {
    pub started_at: Option<DateTime<Utc>>,
    pub spent_usd: f64,
    pub flags: BudgetFlags,
}

/// Per-scope budget state. Mutated only through the cost tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetState {
    /// Lifetime spend of this scope.
    pub cumulative_usd: f64,
    /// Estimates of admitted requests that have not settled yet.
    pub reserved_usd: f64,
    /// Window state keyed by period.
    pub windows: BTreeMap<BudgetPeriod, WindowState>,
}

impl BudgetState {
    pub fn new() -> Self {
        Self {
            cumulative_usd: 0.0,
            reserved_usd: 0.0,
            windows: BudgetPeriod::iter()
                .map(|p| (p, WindowState::default()))
                .collect(),
        }
    }

    /// Clear windows whose start moved since they were last touched.
    pub fn roll(&mut self, policy: &dyn ResetPolicy, now: DateTime<Utc>) {
        for (period, window) in self.windows.iter_mut() {
            let start = policy.window_start(*period, now);
            if window.started_at != start {
                *window = WindowState {
                    started_at: start,
                    ..WindowState::default()
                };
            }
        }
    }

    pub fn spent(&self, period: BudgetPeriod) -> f64 {
        self.windows.get(&period).map_or(0.0, |w| w.spent_usd)
    }

    pub fn flags(&self, period: BudgetPeriod) -> BudgetFlags {
        self.windows.get(&period).map(|w| w.flags).unwrap_or_default()
    }

    /// Add realized spend to every window.
    pub(crate) fn add_spend(&mut self, cost_usd: f64) {
        self.cumulative_usd += cost_usd;
        for window in self.windows.values_mut() {
            window.spent_usd += cost_usd;
        }
    }

    /// Raise flags implied by recorded spend against `limits`. Returns the
    /// newly raised actions per period.
    pub(crate) fn raise_flags(
        &mut self,
        limits: &BudgetLimits,
        thresholds: &Thresholds,
    ) -> Vec<(BudgetPeriod, EnforcementAction)> {
        let mut raised = Vec::new();
        for (period, window) in self.windows.iter_mut() {
            let Some(limit) = limits.limit(*period) else {
                continue;
            };
            let action = thresholds.classify(window.spent_usd, limit);
            // Raising a stronger flag implies the weaker ones.
            for candidate in EnforcementAction::iter_up_to(action) {
                if window.flags.raise(candidate) && candidate == action {
                    raised.push((*period, action));
                }
            }
        }
        raised
    }
}

impl EnforcementAction {
    fn iter_up_to(max: Self) -> impl Iterator<Item = Self> {
        [Self::Warn, Self::Degrade, Self::Block]
            .into_iter()
            .filter(move |a| *a <= max)
    }
}

/// Fractions of a limit at which each action applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub warn_at: f64,
    pub degrade_at: f64,
    pub block_at: f64,
}

impl Thresholds {
    pub fn from_config(config: &BudgetConfig) -> Self {
        Self {
            warn_at: config.warn_at,
            degrade_at: config.degrade_at,
            block_at: config.block_at,
        }
    }

    /// Action for spending `projected` against `limit`. Spending exactly the
    /// block fraction is still allowed.
    pub fn classify(&self, projected: f64, limit: f64) -> EnforcementAction {
        if projected > self.block_at * limit {
            EnforcementAction::Block
        } else if projected >= self.degrade_at * limit {
            EnforcementAction::Degrade
        } else if projected >= self.warn_at * limit {
            EnforcementAction::Warn
        } else {
            EnforcementAction::Allow
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_config(&BudgetConfig::default())
    }
}

/// Inputs handed to an [`EnforcementHook`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementCheck {
    /// Identity, or [`GLOBAL_SCOPE`] for the global budget.
    pub scope: String,
    pub identity: String,
    pub plan: String,
    pub period: Option<BudgetPeriod>,
    pub limit_usd: Option<f64>,
    pub spent_usd: f64,
    pub reserved_usd: f64,
    pub estimate_usd: f64,
    /// Action computed by the built-in policy.
    pub action: EnforcementAction,
}

/// Host-supplied override of the computed action, e.g. an external billing system.
pub type EnforcementHook = Arc<dyn Fn(&EnforcementCheck) -> EnforcementAction + Send + Sync>;

/// The limit that determined an admission decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitingBudget {
    pub scope: String,
    pub period: BudgetPeriod,
    pub limit_usd: f64,
    pub spent_usd: f64,
    pub projected_usd: f64,
    pub resets_at: Option<DateTime<Utc>>,
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub action: EnforcementAction,
    pub reason: String,
    pub limiting: Option<LimitingBudget>,
    pub estimate_usd: f64,
}

impl AdmissionDecision {
    /// Typed denial for blocked decisions.
    pub fn to_budget_exceeded(&self) -> Option<BudgetExceeded> {
        if self.allowed {
            return None;
        }
        let limiting = self.limiting.as_ref()?;
        Some(BudgetExceeded {
            identity: limiting.scope.clone(),
            period: limiting.period,
            limit_usd: limiting.limit_usd,
            spent_usd: limiting.spent_usd,
            requested_usd: self.estimate_usd,
            resets_at: limiting.resets_at,
        })
    }
}

/// Enforcement settings shared by every scope.
#[derive(Clone)]
pub struct EnforcementPolicy {
    pub thresholds: Thresholds,
    pub mode: EnforcementMode,
    pub hook: Option<EnforcementHook>,
}

impl std::fmt::Debug for EnforcementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementPolicy")
            .field("thresholds", &self.thresholds)
            .field("mode", &self.mode)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Evaluate one scope: the strongest action across its limited periods,
/// never weaker than the flags already raised in those windows.
pub(crate) fn evaluate_scope(
    scope: &str,
    state: &BudgetState,
    limits: &BudgetLimits,
    thresholds: &Thresholds,
    estimate: f64,
    policy: &dyn ResetPolicy,
    now: DateTime<Utc>,
) -> (EnforcementAction, Option<LimitingBudget>) {
    let mut worst = (EnforcementAction::Allow, None);
    for period in BudgetPeriod::iter() {
        let Some(limit) = limits.limit(period) else {
            continue;
        };
        let spent = state.spent(period);
        let projected = spent + state.reserved_usd + estimate;
        let action = thresholds.classify(projected, limit).max(state.flags(period).floor());
        if action > worst.0 || worst.1.is_none() {
            worst = (
                action,
                Some(LimitingBudget {
                    scope: scope.to_string(),
                    period,
                    limit_usd: limit,
                    spent_usd: spent,
                    projected_usd: projected,
                    resets_at: policy.next_reset(period, now),
                }),
            );
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::reset::CalendarResetPolicy;

    fn daily(limit: f64) -> BudgetLimits {
        BudgetLimits {
            daily_usd: Some(limit),
            ..BudgetLimits::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap()
    }

    #[test]
    fn classify_bands() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.5, 1.0), EnforcementAction::Allow);
        assert_eq!(t.classify(0.8, 1.0), EnforcementAction::Warn);
        assert_eq!(t.classify(0.95, 1.0), EnforcementAction::Degrade);
        assert_eq!(t.classify(1.0, 1.0), EnforcementAction::Degrade);
        assert_eq!(t.classify(1.01, 1.0), EnforcementAction::Block);
    }

    #[test]
    fn projection_includes_estimate_and_reservations() {
        let mut state = BudgetState::new();
        state.roll(&CalendarResetPolicy, now());
        state.add_spend(0.095);
        let (action, limiting) = evaluate_scope(
            "alice",
            &state,
            &daily(0.10),
            &Thresholds::default(),
            0.02,
            &CalendarResetPolicy,
            now(),
        );
        assert_eq!(action, EnforcementAction::Block);
        let limiting = limiting.unwrap();
        assert_eq!(limiting.period, BudgetPeriod::Daily);
        assert!((limiting.projected_usd - 0.115).abs() < 1e-12);
        assert!(limiting.resets_at.is_some());

        state.reserved_usd = 0.0;
        let (action, _) = evaluate_scope(
            "alice",
            &state,
            &daily(10.0),
            &Thresholds::default(),
            0.02,
            &CalendarResetPolicy,
            now(),
        );
        assert_eq!(action, EnforcementAction::Allow);
    }

    #[test]
    fn raised_flags_are_sticky_within_window() {
        let mut state = BudgetState::new();
        state.roll(&CalendarResetPolicy, now());
        state.add_spend(0.85);
        let raised = state.raise_flags(&daily(1.0), &Thresholds::default());
        assert_eq!(raised, vec![(BudgetPeriod::Daily, EnforcementAction::Warn)]);
        assert!(state.flags(BudgetPeriod::Daily).warned);

        // Even a looser limit keeps the raised floor.
        let (action, _) = evaluate_scope(
            "bob",
            &state,
            &daily(100.0),
            &Thresholds::default(),
            0.0,
            &CalendarResetPolicy,
            now(),
        );
        assert_eq!(action, EnforcementAction::Warn);

        // Raising the same flag twice reports nothing new.
        assert!(state.raise_flags(&daily(1.0), &Thresholds::default()).is_empty());
    }

    #[test]
    fn window_roll_clears_spend_and_flags() {
        let mut state = BudgetState::new();
        state.roll(&CalendarResetPolicy, now());
        state.add_spend(2.0);
        state.raise_flags(&daily(1.0), &Thresholds::default());
        assert!(state.flags(BudgetPeriod::Daily).blocked);

        state.roll(&CalendarResetPolicy, now() + chrono::Duration::days(1));
        assert_eq!(state.spent(BudgetPeriod::Daily), 0.0);
        assert_eq!(state.flags(BudgetPeriod::Daily), BudgetFlags::default());
        assert_eq!(state.spent(BudgetPeriod::Total), 2.0);
        assert_eq!(state.cumulative_usd, 2.0);
    }

    #[test]
    fn unlimited_scope_allows() {
        let state = BudgetState::new();
        let (action, limiting) = evaluate_scope(
            "carol",
            &state,
            &BudgetLimits::default(),
            &Thresholds::default(),
            1_000.0,
            &CalendarResetPolicy,
            now(),
        );
        assert_eq!(action, EnforcementAction::Allow);
        assert!(limiting.is_none());
    }

    #[test]
    fn blocked_decision_converts_to_budget_exceeded() {
        let decision = AdmissionDecision {
            allowed: false,
            action: EnforcementAction::Block,
            reason: "daily budget exceeded".into(),
            limiting: Some(LimitingBudget {
                scope: "alice".into(),
                period: BudgetPeriod::Daily,
                limit_usd: 0.10,
                spent_usd: 0.095,
                projected_usd: 0.115,
                resets_at: None,
            }),
            estimate_usd: 0.02,
        };
        let err = decision.to_budget_exceeded().unwrap();
        assert_eq!(err.identity, "alice");
        assert_eq!(err.requested_usd, 0.02);
    }

    #[test]
    fn action_display_is_lowercase() {
        assert_eq!(EnforcementAction::Degrade.to_string(), "degrade");
        assert!(EnforcementAction::Block > EnforcementAction::Warn);
    }
}
