// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The decision a run takes on its validated output.

use draftwise_core::Domain;
use serde::Serialize;

/// What the controller does with a validated draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Accept,
    Escalate,
    /// The domain's pipeline decided; `step` names the step whose output was returned.
    RunPipeline,
}

/// A decision together with the values it was taken on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeDecision {
    pub kind: DecisionKind,
    pub confidence: f64,
    pub threshold: f64,
    /// Quality components below their domain floor.
    pub floor_violations: Vec<&'static str>,
    /// Pipeline step that produced the returned output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub reason: String,
}

impl CascadeDecision {
    /// Decide on a draft. Floors are checked first: any violation escalates
    /// regardless of confidence. Otherwise confidence equal to the threshold
    /// passes.
    pub fn decide(confidence: f64, threshold: f64, floor_violations: Vec<&'static str>) -> Self {
        let (kind, reason) = if !floor_violations.is_empty() {
            (
                DecisionKind::Escalate,
                format!("below domain floor: {}", floor_violations.join(", ")),
            )
        } else if confidence >= threshold {
            (
                DecisionKind::Accept,
                format!("confidence {confidence:.3} meets threshold {threshold:.3}"),
            )
        } else {
            (
                DecisionKind::Escalate,
                format!("confidence {confidence:.3} below threshold {threshold:.3}"),
            )
        };
        Self {
            kind,
            confidence,
            threshold,
            floor_violations,
            step: None,
            reason,
        }
    }

    /// Outcome of a pipeline run for `domain`. `passed` is false when every
    /// step failed and `step` is the one whose output is returned degraded.
    pub fn pipeline(
        domain: Domain,
        step: &str,
        passed: bool,
        confidence: f64,
        threshold: f64,
        floor_violations: Vec<&'static str>,
    ) -> Self {
        let reason = if passed {
            format!(
                "{domain} pipeline step `{step}` passed at confidence {confidence:.3} \
                 (threshold {threshold:.3})"
            )
        } else {
            format!(
                "{domain} pipeline exhausted, returning step `{step}` output at confidence \
                 {confidence:.3} (threshold {threshold:.3})"
            )
        };
        Self {
            kind: DecisionKind::RunPipeline,
            confidence,
            threshold,
            floor_violations,
            step: Some(step.to_string()),
            reason,
        }
    }

    /// The draft was accepted without escalation.
    pub fn accepted(&self) -> bool {
        self.kind == DecisionKind::Accept
    }
}
