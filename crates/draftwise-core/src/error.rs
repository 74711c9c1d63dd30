// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Draftwise cascade engine.
//!
//! Quality failures are not errors: a draft that scores below its threshold
//! is an ordinary cascade outcome. Only configuration and budget problems
//! reach the caller as distinct failures; provider failures are recovered
//! inside the cascade unless every fallback is exhausted.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BudgetPeriod;

/// The primary error type used across all Draftwise crates.
#[derive(Debug, Error)]
pub enum DraftwiseError {
    /// Invalid configuration (threshold tables, unknown models, missing providers).
    /// Raised while building an engine, never while serving a query.
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider-side failure (network, rate limit, malformed response).
    #[error("provider error from {model}: {message}")]
    Provider {
        model: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider call exceeded its deadline.
    #[error("provider call to {model} timed out after {duration:?}")]
    Timeout { model: String, duration: Duration },

    /// Budget admission denied before any model was invoked.
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),

    /// The caller aborted the query.
    #[error("query cancelled by caller")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DraftwiseError {
    /// Convenience constructor for provider failures without an underlying source.
    pub fn provider(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            model: model.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether this failure is handled by the cascade's fallback path
    /// instead of being reported to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout { .. })
    }
}

/// Terminal budget outcome carrying the limiting budget and its reset time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetExceeded {
    /// Identity whose budget denied the request (`"*"` for the global budget).
    pub identity: String,
    /// Budget window that denied the request.
    pub period: BudgetPeriod,
    /// Configured limit for that window in USD.
    pub limit_usd: f64,
    /// Spend already recorded in the window, including outstanding reservations.
    pub spent_usd: f64,
    /// Estimated cost of the denied request.
    pub requested_usd: f64,
    /// When the window resets. `None` for lifetime (`total`) budgets.
    pub resets_at: Option<DateTime<Utc>>,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} budget of ${:.4} for `{}` exceeded (spent ${:.4}, requested ${:.4})",
            self.period, self.limit_usd, self.identity, self.spent_usd, self.requested_usd
        )?;
        match self.resets_at {
            Some(at) => write!(f, "; resets at {}", at.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "; lifetime budget does not reset"),
        }
    }
}

impl std::error::Error for BudgetExceeded {}
