// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cascade decision engine for the Draftwise framework.
//!
//! The [`CascadeEngine`] is the central coordinator that:
//! - Classifies each query by domain and complexity
//! - Admits it against per-identity and global budgets
//! - Drafts with the cheapest suitable model
//! - Validates the draft and accepts it or escalates to a verifier
//! - Runs multi-step [`PipelineStrategy`] flows for configured domains
//! - Records the realized cost of every model call

pub mod controller;
pub mod decision;
pub mod executor;
pub mod pipeline;
pub mod result;
pub mod state;
pub mod threshold;

pub use controller::{CascadeEngine, CascadeEngineBuilder};
pub use decision::{CascadeDecision, DecisionKind};
pub use executor::DraftExecutor;
pub use pipeline::{CascadeStep, MinConfidence, PipelineStrategy, StepEvaluation, StepValidator};
pub use result::{CascadeRequest, CascadeResult, StepOutcome, StepTrace};
pub use state::CascadeState;
pub use threshold::ThresholdTable;
