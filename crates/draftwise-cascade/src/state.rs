// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! States of one cascade run.
//!
//! A run moves Drafted -> Validated -> {Accepted, Escalating, PipelineStep(n)}
//! -> Terminal. The state recorded on each trace step is the state the run was
//! in when that step finished.

use serde::Serialize;

/// States in the cascade FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeState {
    /// A draft was produced (or the draft call failed).
    Drafted,
    /// The draft was scored and a decision taken.
    Validated,
    /// The draft passed and is the final answer.
    Accepted,
    /// The draft failed and a verifier is being invoked.
    Escalating,
    /// Executing step `n` (zero-based) of a domain pipeline.
    PipelineStep(usize),
    /// The run finished.
    Terminal,
}

impl std::fmt::Display for CascadeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CascadeState::Drafted => write!(f, "drafted"),
            CascadeState::Validated => write!(f, "validated"),
            CascadeState::Accepted => write!(f, "accepted"),
            CascadeState::Escalating => write!(f, "escalating"),
            CascadeState::PipelineStep(n) => write!(f, "pipeline_step({n})"),
            CascadeState::Terminal => write!(f, "terminal"),
        }
    }
}
