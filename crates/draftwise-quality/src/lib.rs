// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft quality validation and confidence estimation.

pub mod confidence;
mod text;
pub mod validator;

pub use confidence::ConfidenceEstimator;
pub use validator::{QualityScore, QualityValidator};
