//! FILENAME: grid-model/src/diagnostics.rs
//! Warning collector passed explicitly into layout and filter calls.
//!
//! A warning is reported once per (table, kind, subject) for the lifetime
//! of the collector, so a caller that keeps one `Diagnostics` per table
//! sees each configuration problem once rather than on every layout pass.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Two columns resolved to the same key.
    DuplicateKey,
    /// More than one column is flagged as primary key.
    DuplicatePrimaryKey,
    /// More than one column pinned to the same edge.
    MultipleFixedColumns,
    /// A header group contains a leaf that can never be shown.
    UnreachableLeaf,
    /// A filter entry references a column that does not exist.
    UnknownFilterColumn,
    /// A filter entry uses an operator the column does not allow.
    UnknownOperator,
    /// A filter entry could not be interpreted.
    InvalidFilterEntry,
    /// A column key collides with a keyword of the filter grammar.
    ReservedFilterColumn,
    /// A persisted layout value could not be read.
    MalformedStoredValue,
}

impl DiagnosticKind {
    /// Log target for this kind.
    pub fn category(&self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateKey
            | DiagnosticKind::DuplicatePrimaryKey
            | DiagnosticKind::MultipleFixedColumns
            | DiagnosticKind::UnreachableLeaf => "LAYOUT",
            DiagnosticKind::UnknownFilterColumn
            | DiagnosticKind::UnknownOperator
            | DiagnosticKind::InvalidFilterEntry
            | DiagnosticKind::ReservedFilterColumn => "FILTER",
            DiagnosticKind::MalformedStoredValue => "STATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub table_id: String,
    pub kind: DiagnosticKind,
    /// Column key, filter column or storage key the warning is about.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    seen: FxHashSet<(String, DiagnosticKind, String)>,
    pending: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning. Returns false (and does nothing) when the same
    /// warning was already recorded by this collector.
    pub fn record(
        &mut self,
        table_id: &str,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        let subject = subject.into();
        if !self.seen.insert((table_id.to_string(), kind, subject.clone())) {
            return false;
        }
        let message = message.into();
        log::warn!(target: kind.category(), "[{}] {}", table_id, message);
        self.pending.push(Diagnostic {
            table_id: table_id.to_string(),
            kind,
            subject,
            message,
        });
        true
    }

    /// Drains the warnings recorded since the last call.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.pending)
    }

    /// Warnings not yet taken.
    pub fn pending(&self) -> &[Diagnostic] {
        &self.pending
    }

    pub fn has_pending(&self, kind: DiagnosticKind) -> bool {
        self.pending.iter().any(|d| d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
