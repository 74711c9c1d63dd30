// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query classification and model selection for the Draftwise cascade.
//!
//! This crate provides:
//! - [`DomainDetector`]: keyword and pattern domain detection, with
//!   [`SemanticDomainDetector`] adding an optional classifier fallback
//! - [`ComplexityAnalyzer`]: heuristic complexity tiers (zero-cost, zero-latency)
//! - [`ModelSelector`]: budget-aware candidate lists from the model catalog

pub mod complexity;
pub mod domain;
pub mod selector;

pub use complexity::{ComplexityAnalysis, ComplexityAnalyzer};
pub use domain::{DomainDetection, DomainDetector, ExemplarDomainClassifier, SemanticDomainDetector};
pub use selector::{ModelSelector, SelectionRequest};
