// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenization helpers shared by the quality checks.

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "am", "do",
    "does", "did", "what", "which", "who", "whom", "whose", "when", "where", "why", "how",
    "of", "in", "on", "at", "to", "for", "from", "by", "with", "about", "as", "into",
    "and", "or", "but", "if", "then", "so", "than", "that", "this", "these", "those",
    "it", "its", "i", "me", "my", "we", "our", "you", "your", "he", "she", "they",
    "them", "their", "can", "could", "should", "would", "will", "shall", "may", "might",
    "must", "have", "has", "had", "not", "no", "yes", "any", "some", "all", "there",
    "here", "please", "tell", "explain", "give", "show", "describe", "much", "many",
    "very", "just", "also", "like", "get", "make",
];

/// Lowercased word tokens. Apostrophes stay inside words (`i'm`, `don't`).
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase().replace('\u{2019}', "'"))
        .collect()
}

/// Sentence-like segments split on terminal punctuation and newlines.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.split_whitespace().next().is_some())
        .collect()
}

/// Distinct content words of `text`, in first-seen order.
pub(crate) fn key_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(text)
        .into_iter()
        .filter(|t| is_content_word(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn is_content_word(token: &str) -> bool {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    token.chars().count() >= 3 && !STOPWORDS.contains(&token)
}

/// Whether `term` appears in `vocabulary`, allowing shared stems for longer words
/// (`symptoms` matches `symptom`, `optimizing` matches `optimize`).
pub(crate) fn term_present(vocabulary: &HashSet<String>, term: &str) -> bool {
    if vocabulary.contains(term) {
        return true;
    }
    let stem: String = term.chars().take(5).collect();
    term.chars().count() >= 5 && vocabulary.iter().any(|w| w.starts_with(&stem))
}

/// Number of (possibly overlapping) occurrences of a multi-word phrase.
pub(crate) fn count_phrase(tokens: &[String], phrase: &str) -> usize {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(needle.len())
        .filter(|w| w.iter().zip(&needle).all(|(a, b)| a == b))
        .count()
}
