// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all collaborator adapters must implement.

use async_trait::async_trait;

use crate::error::DraftwiseError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Draftwise collaborator adapters.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the identifier of this adapter instance. For providers this is
    /// the value matched against [`ModelDescriptor::provider`](crate::ModelDescriptor).
    fn name(&self) -> &str;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, DraftwiseError> {
        Ok(HealthStatus::Healthy)
    }
}
