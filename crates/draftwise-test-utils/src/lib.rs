// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Draftwise integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock LLM provider with scripted per-model replies
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder
//! - [`MockClassifier`] - Domain classifier returning a fixed answer
//! - [`TestHarness`] - Cascade engine wired to mock providers

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::{MockClassifier, MockEmbedder};
pub use mock_provider::{MockProvider, MockReply};
