//! Output formatting for scan results

pub mod json;
pub mod pretty;

use sable_core::{Report, SinkRef};
use serde::Serialize;

/// One analyzed file's findings, in discovery order.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub reports: Vec<Report>,
    /// Every sink call observed, tainted or not.
    pub reported_sinks: Vec<SinkRef>,
    pub parse_errors: Vec<String>,
}

impl FileReport {
    pub fn has_findings(&self) -> bool {
        !self.reports.is_empty()
    }
}
