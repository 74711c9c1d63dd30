// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spend forecasting and cost anomaly detection over recorded entries.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::tracker::CostEntry;

/// Projected spend from the trailing average daily spend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendForecast {
    /// Identity the forecast covers; `None` for all identities.
    pub identity: Option<String>,
    pub trailing_daily_usd: f64,
    pub horizon_days: u32,
    pub projected_usd: f64,
    /// Days until `remaining_usd` is used up at the trailing rate.
    pub days_until_limit: Option<f64>,
}

/// Trailing-average spend forecaster.
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    /// Days of history averaged.
    pub window_days: u32,
    /// Days projected forward.
    pub horizon_days: u32,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            window_days: 7,
            horizon_days: 30,
        }
    }
}

impl Forecaster {
    pub fn new(window_days: u32, horizon_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
            horizon_days,
        }
    }

    /// Forecast spend for `identity` (or everyone) given `remaining_usd` headroom.
    pub fn forecast(
        &self,
        entries: &[CostEntry],
        identity: Option<&str>,
        remaining_usd: Option<f64>,
        now: DateTime<Utc>,
    ) -> SpendForecast {
        let since = now - Duration::days(i64::from(self.window_days));
        let spent: f64 = entries
            .iter()
            .filter(|e| identity.is_none_or(|id| e.identity == id))
            .filter(|e| e.recorded_at > since && e.recorded_at <= now)
            .map(|e| e.cost_usd)
            .sum();
        let trailing_daily_usd = spent / f64::from(self.window_days);
        let days_until_limit = match remaining_usd {
            Some(remaining) if trailing_daily_usd > 0.0 => {
                Some((remaining / trailing_daily_usd).max(0.0))
            }
            _ => None,
        };

        SpendForecast {
            identity: identity.map(str::to_string),
            trailing_daily_usd,
            horizon_days: self.horizon_days,
            projected_usd: trailing_daily_usd * f64::from(self.horizon_days),
            days_until_limit,
        }
    }
}

/// An entry whose cost deviates from the mean by more than the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnomaly {
    pub entry_id: String,
    pub identity: String,
    pub model: String,
    pub cost_usd: f64,
    pub z_score: f64,
}

/// Z-score detector over entry costs.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    pub z_threshold: f64,
    /// Fewer entries than this never produce anomalies.
    pub min_samples: usize,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            z_threshold: 3.0,
            min_samples: 10,
        }
    }
}

impl AnomalyDetector {
    pub fn new(z_threshold: f64, min_samples: usize) -> Self {
        Self {
            z_threshold,
            min_samples: min_samples.max(2),
        }
    }

    pub fn detect(&self, entries: &[CostEntry]) -> Vec<CostAnomaly> {
        if entries.len() < self.min_samples {
            return Vec::new();
        }
        let n = entries.len() as f64;
        let mean = entries.iter().map(|e| e.cost_usd).sum::<f64>() / n;
        let variance = entries
            .iter()
            .map(|e| (e.cost_usd - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        if std_dev <= f64::EPSILON {
            return Vec::new();
        }

        entries
            .iter()
            .filter_map(|e| {
                let z_score = (e.cost_usd - mean) / std_dev;
                (z_score.abs() > self.z_threshold).then(|| CostAnomaly {
                    entry_id: e.id.clone(),
                    identity: e.identity.clone(),
                    model: e.model.clone(),
                    cost_usd: e.cost_usd,
                    z_score,
                })
            })
            .collect()
    }
}
