//! JSON formatter for machine-readable output

use serde::Serialize;

use crate::output::FileReport;

#[derive(Debug, Serialize)]
struct JsonEnvelope<'a> {
    files: &'a [FileReport],
    summary: JsonSummary,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    file_count: usize,
    flow_count: usize,
    sink_count: usize,
    parse_error_count: usize,
}

pub fn format(files: &[FileReport]) -> serde_json::Result<String> {
    let summary = JsonSummary {
        file_count: files.len(),
        flow_count: files.iter().map(|f| f.reports.len()).sum(),
        sink_count: files.iter().map(|f| f.reported_sinks.len()).sum(),
        parse_error_count: files.iter().map(|f| f.parse_errors.len()).sum(),
    };
    serde_json::to_string_pretty(&JsonEnvelope { files, summary })
}
