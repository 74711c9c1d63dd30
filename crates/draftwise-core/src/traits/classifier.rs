// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain classifier adapter trait for ML-backed domain detection.

use async_trait::async_trait;

use crate::error::DraftwiseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Domain;

/// Adapter that classifies text into a domain with a confidence in [0, 1].
///
/// Consulted only when semantic fallback is enabled and the rule-based
/// detector is not confident enough.
#[async_trait]
pub trait DomainClassifierAdapter: PluginAdapter {
    async fn classify(&self, text: &str) -> Result<(Domain, f64), DraftwiseError>;
}
