// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost tracking and budget enforcement for the Draftwise cascade engine.
//!
//! This crate provides:
//! - **Cost tracker**: identity-keyed ledger with per-identity exclusive sections
//!   and admission reservations
//! - **Budget policy**: warn/degrade/block thresholds, enforcement modes and a
//!   host override hook
//! - **Pricing**: per-1k token cost from catalog descriptors
//! - **Forecasting**: trailing-average spend projection and z-score anomalies
//! - **Export**: serializable snapshots and a JSON exporter

pub mod budget;
pub mod export;
pub mod forecast;
pub mod pricing;
pub mod reset;
pub mod tracker;

pub use budget::{
    AdmissionDecision, BudgetState, EnforcementAction, EnforcementCheck, EnforcementHook,
    GLOBAL_SCOPE, LimitingBudget,
};
pub use export::{CostExporter, CostSnapshot, JsonExporter};
pub use forecast::{AnomalyDetector, CostAnomaly, Forecaster, SpendForecast};
pub use reset::{CalendarResetPolicy, Clock, ManualClock, ResetPolicy, SystemClock};
pub use tracker::{BudgetReservation, CostEntry, CostTracker};
