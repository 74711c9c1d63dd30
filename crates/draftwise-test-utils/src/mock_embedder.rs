// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding and domain classifier adapters.

use async_trait::async_trait;

use draftwise_core::{
    AdapterType, DomainClassifierAdapter, Domain, DraftwiseError, EmbeddingAdapter,
    PluginAdapter,
};

const DIMENSIONS: usize = 64;

/// Hashed bag-of-words embedder. Texts sharing words land close together.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An embedder whose every call fails.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMENSIONS as u64) as usize
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DraftwiseError> {
        if self.fail {
            return Err(DraftwiseError::Internal("embedding backend offline".into()));
        }
        let mut vector = vec![0.0_f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }
}

/// Domain classifier that always answers with the configured domain.
#[derive(Debug)]
pub struct MockClassifier {
    domain: Domain,
    confidence: f64,
}

impl MockClassifier {
    pub fn new(domain: Domain, confidence: f64) -> Self {
        Self { domain, confidence }
    }
}

#[async_trait]
impl PluginAdapter for MockClassifier {
    fn name(&self) -> &str {
        "mock-classifier"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DomainClassifier
    }
}

#[async_trait]
impl DomainClassifierAdapter for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<(Domain, f64), DraftwiseError> {
        Ok((self.domain, self.confidence))
    }
}
