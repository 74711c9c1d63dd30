// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors and validation failures become [`ConfigError`] values that
//! miette renders with the offending TOML key underlined and a "did you mean"
//! hint taken from the keys or catalog entries that would have matched.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be offered as a correction.
/// Catches `verifer_model` -> `verifier_model` and `gpt-4o-mni` -> `gpt-4o-mini`.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, renderable as a miette report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", table_name(.section))]
    #[diagnostic(
        code(draftwise::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), &format!("valid keys: {valid_keys}")))
    )]
    UnknownKey {
        key: String,
        /// Dotted path of the enclosing table; empty at the top level.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(code(draftwise::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the value.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing key `{key}` in {}", table_name(.section))]
    #[diagnostic(code(draftwise::config::missing_key), help("add `{key} = <value>`"))]
    MissingKey { key: String, section: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(draftwise::config::validation))]
    Validation { message: String },

    /// A model reference that does not resolve against the `[[models]]` catalog.
    #[error("unknown model `{model}` referenced by {context}")]
    #[diagnostic(
        code(draftwise::config::unknown_model),
        help("{}", did_you_mean(suggestion.as_deref(), "declare it under [[models]] first"))
    )]
    UnknownModel {
        /// Config path of the reference.
        context: String,
        model: String,
        suggestion: Option<String>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(draftwise::config::other))]
    Other(String),
}

impl ConfigError {
    /// Translate one figment error, resolving a source span from `sources`
    /// (pairs of display name and TOML content) when the key can be found.
    fn from_figment(error: &figment::Error, sources: &[(String, String)]) -> Self {
        match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(error, &error.path, field, sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section: error.path.join("."),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
                section: error.path.join("."),
            },
            Kind::InvalidType(found, expected) => {
                let (span, src) = match error.path.split_last() {
                    Some((key, section)) => locate(error, section, key, sources),
                    None => (None, None),
                };
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        }
    }
}

fn table_name(section: &str) -> String {
    if section.is_empty() {
        "the top-level table".to_string()
    } else {
        format!("[{section}]")
    }
}

fn did_you_mean(suggestion: Option<&str>, otherwise: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {otherwise}"),
        None => otherwise.to_string(),
    }
}

/// Convert every error carried by a `figment::Error` into a diagnostic.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| ConfigError::from_figment(&error, sources))
        .collect()
}

/// Span of `field` under `section` in whichever source produced `error`.
/// Inline sources carry no file metadata, so a lone source is used as is.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if field.is_empty() {
        return (None, None);
    }
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let source = match origin {
        Some(path) => sources.iter().find(|(name, _)| *name == path),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    source
        .and_then(|(name, content)| {
            let offset = find_key_offset(content, section, field)?;
            Some((
                SourceSpan::new(offset.into(), field.len()),
                NamedSource::new(name, content.clone()),
            ))
        })
        .map_or((None, None), |(span, src)| (Some(span), Some(src)))
}

/// Byte offset of the `field = ...` line under the table `section`.
///
/// Dotted tables fall back to their closest declared ancestor, so
/// `["cascade", "domain_thresholds"]` searches after `[cascade]` when only
/// that header exists. An empty section searches from the start.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let start = if section.is_empty() {
        0
    } else {
        (1..=section.len()).rev().find_map(|len| {
            let header = format!("[{}]", section[..len].join("."));
            content.find(&header).map(|pos| pos + header.len())
        })?
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let assigns_field = line[indent..]
            .strip_prefix(field)
            .is_some_and(|after| after.trim_start().starts_with('='));
        if assigns_field {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if any scores
/// above the suggestion threshold.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Render `errors` as consecutive miette reports.
pub fn render_errors(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    out
}
