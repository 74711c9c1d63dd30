// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every external collaborator the cascade consumes (providers, embedders,
//! domain classifiers) extends the [`PluginAdapter`] base trait and uses
//! `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod classifier;
pub mod embedding;
pub mod provider;

pub use adapter::PluginAdapter;
pub use classifier::DomainClassifierAdapter;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
