// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM provider integrations.

use async_trait::async_trait;

use crate::error::DraftwiseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ModelDescriptor, ProviderRequest, ProviderResponse};

/// Adapter for LLM providers.
///
/// All provider-specific code lives behind this trait; the cascade only
/// consumes the normalized [`ProviderResponse`].
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Invokes `model` with the request and returns the complete response.
    async fn invoke(
        &self,
        model: &ModelDescriptor,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, DraftwiseError>;

    /// Whether the provider can stream partial output.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Whether responses carry token usage. When false, usage is estimated.
    fn reports_usage(&self) -> bool {
        true
    }
}
