// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only snapshots of the cost ledger and pluggable exporters.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use draftwise_core::DraftwiseError;
use serde::Serialize;

use crate::tracker::CostEntry;

/// Entry log and aggregates at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSnapshot {
    pub entries: Vec<CostEntry>,
    pub total_usd: f64,
    pub by_identity: BTreeMap<String, f64>,
    pub by_model: BTreeMap<String, f64>,
    pub taken_at: DateTime<Utc>,
}

impl CostSnapshot {
    /// Entries recorded for one identity, in recording order.
    pub fn entries_for<'a>(&'a self, identity: &'a str) -> impl Iterator<Item = &'a CostEntry> {
        self.entries.iter().filter(move |e| e.identity == identity)
    }
}

/// Sink for cost snapshots. Persistence format is up to the implementation.
pub trait CostExporter: Send {
    fn export(&mut self, snapshot: &CostSnapshot) -> Result<(), DraftwiseError>;
}

/// Writes each snapshot as one JSON document.
#[derive(Debug)]
pub struct JsonExporter<W> {
    writer: W,
    pretty: bool,
}

impl<W: Write + Send> JsonExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> CostExporter for JsonExporter<W> {
    fn export(&mut self, snapshot: &CostSnapshot) -> Result<(), DraftwiseError> {
        let result = if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, snapshot)
        } else {
            serde_json::to_writer(&mut self.writer, snapshot)
        };
        result.map_err(|e| DraftwiseError::Internal(format!("cost export failed: {e}")))?;
        writeln!(self.writer)
            .and_then(|()| self.writer.flush())
            .map_err(|e| DraftwiseError::Internal(format!("cost export failed: {e}")))
    }
}
