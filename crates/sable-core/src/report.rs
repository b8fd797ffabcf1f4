//! Taint flow reports and the open/close tracker
//!
//! A report is opened the first time a source expression is observed,
//! accumulates chain steps while the value moves through assignments and
//! calls, and is closed and emitted the moment a sink consumes it.

use std::fmt;

use serde::Serialize;

/// 1-based line, 0-based display column, as resolved through the swc
/// source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Where a tainted value entered the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub name: String,
    pub file: String,
    pub position: Position,
}

impl SourceRef {
    pub fn new(name: impl Into<String>, file: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            position,
        }
    }
}

/// The call that consumed a tainted value, or any call matching a sink
/// pattern when collected into the audit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkRef {
    pub name: String,
    pub file: String,
    pub position: Position,
}

impl SinkRef {
    pub fn new(name: impl Into<String>, file: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// The tainted value was assigned to a new name.
    Assignment,
    /// The tainted value was passed through a non-sink call.
    Call,
}

/// One intermediate step between a source and its sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub kind: ChainKind,
    pub name: String,
    pub file: String,
    pub position: Position,
}

impl ChainEntry {
    pub fn new(
        kind: ChainKind,
        name: impl Into<String>,
        file: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            file: file.into(),
            position,
        }
    }
}

/// A source-to-sink flow. `sink` is `None` while the report is still open;
/// every emitted report has a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub source: SourceRef,
    pub sink: Option<SinkRef>,
    pub chain: Vec<ChainEntry>,
}

impl Report {
    pub fn open(source: SourceRef) -> Self {
        Self {
            source,
            sink: None,
            chain: Vec::new(),
        }
    }
}

/// True when `candidate` refers to `open` or to something reached through
/// it: equality, or `open` followed by a `.`, `(` or `[` segment boundary.
/// `req.query` matches `req.query.id` but not `req.querystring`.
pub fn name_matches(open: &str, candidate: &str) -> bool {
    if candidate == open {
        return true;
    }
    match candidate.strip_prefix(open) {
        Some(rest) => rest.starts_with(['.', '(', '[']),
        None => false,
    }
}

/// Tracks open reports per canonical source name and collects emitted ones.
///
/// Opening is idempotent: a source that keeps recurring under the same (or a
/// prefixed) name stays a single open report. Closing removes the report
/// from the open set, so each flow is emitted at most once. Open reports
/// never expire and are never emitted.
#[derive(Debug, Default)]
pub struct ReportTracker {
    open: Vec<Report>,
    emitted: Vec<Report>,
}

impl ReportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_open_mut(&mut self, name: &str) -> Option<&mut Report> {
        self.open
            .iter_mut()
            .find(|r| name_matches(&r.source.name, name))
    }

    fn find_open_index(&self, name: &str) -> Option<usize> {
        self.open
            .iter()
            .position(|r| name_matches(&r.source.name, name))
    }

    /// Opens a report for `source` unless one already tracks it.
    /// Returns true when a new report was opened.
    pub fn open_source(&mut self, source: SourceRef) -> bool {
        if self.find_open_index(&source.name).is_some() {
            return false;
        }
        self.open.push(Report::open(source));
        true
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.find_open_index(name).is_some()
    }

    /// Appends a chain step to the open report tracking `name`, if any.
    pub fn record_step(&mut self, name: &str, entry: ChainEntry) -> bool {
        match self.find_open_mut(name) {
            Some(report) => {
                report.chain.push(entry);
                true
            }
            None => false,
        }
    }

    /// Closes the open report tracking `name` with `sink` and emits it.
    pub fn close(&mut self, name: &str, sink: SinkRef) -> Option<&Report> {
        let index = self.find_open_index(name)?;
        let mut report = self.open.remove(index);
        report.sink = Some(sink);
        self.emitted.push(report);
        self.emitted.last()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn emitted(&self) -> &[Report] {
        &self.emitted
    }

    /// Folds reports emitted by a nested module analysis into this tracker.
    pub fn absorb(&mut self, reports: Vec<Report>) {
        self.emitted.extend(reports);
    }

    pub fn into_reports(self) -> Vec<Report> {
        self.emitted
    }
}
