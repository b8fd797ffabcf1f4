//! Pretty formatter for human-readable terminal output
//!
//! Displays flows with colors, source code context, and a summary line.

use std::collections::HashMap;
use std::fs;

use colored::Colorize;
use sable_core::{ChainKind, Report};

use crate::output::FileReport;

pub struct PrettyFormatter {
    sources: HashMap<String, String>,
    show_sinks: bool,
}

impl PrettyFormatter {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            show_sinks: false,
        }
    }

    pub fn with_sources(sources: HashMap<String, String>) -> Self {
        Self {
            sources,
            show_sinks: false,
        }
    }

    /// Also list every sink call that was observed without a tainted flow.
    pub fn show_sinks(mut self, enabled: bool) -> Self {
        self.show_sinks = enabled;
        self
    }

    pub fn format(&self, files: &[FileReport]) -> String {
        let mut output = String::new();

        for file in files {
            for error in &file.parse_errors {
                output.push_str(&format!(
                    "{}: {} in {}\n",
                    "parse error".yellow().bold(),
                    error,
                    file.file
                ));
            }
            for report in &file.reports {
                output.push_str(&self.format_report(report));
                output.push('\n');
            }
            if self.show_sinks {
                for sink in &file.reported_sinks {
                    output.push_str(&format!(
                        "{}: {} at {}:{}\n",
                        "sink".cyan(),
                        sink.name,
                        sink.file,
                        sink.position
                    ));
                }
            }
        }

        output.push_str(&self.format_summary(files));
        output
    }

    fn format_report(&self, report: &Report) -> String {
        let mut lines = Vec::new();

        let sink_name = report
            .sink
            .as_ref()
            .map(|sink| sink.name.as_str())
            .unwrap_or("<open>");
        lines.push(format!(
            "{}: tainted flow from `{}` to `{}`",
            "error".red().bold(),
            report.source.name,
            sink_name
        ));

        lines.push(format!(
            "  {} {}:{}",
            "-->".blue(),
            report.source.file,
            report.source.position
        ));
        if let Some(context) = self.source_context(&report.source.file, report.source.position.line)
        {
            lines.extend(context);
        }

        for step in &report.chain {
            let verb = match step.kind {
                ChainKind::Assignment => "assigned to",
                ChainKind::Call => "passed through",
            };
            lines.push(format!(
                "   {} {} `{}` ({}:{})",
                "=".blue(),
                verb,
                step.name,
                step.file,
                step.position
            ));
        }

        if let Some(sink) = &report.sink {
            lines.push(format!(
                "   {} {} `{}` ({}:{})",
                "=".blue(),
                "consumed by sink".red(),
                sink.name,
                sink.file,
                sink.position
            ));
        }

        lines.join("\n") + "\n"
    }

    fn source_context(&self, file: &str, line: usize) -> Option<Vec<String>> {
        let source_line = self.get_source_line(file, line)?;
        let line_num_width = line.to_string().len();
        let padding = " ".repeat(line_num_width);

        Some(vec![
            format!("{} {}", padding, "|".blue()),
            format!("{} {} {}", line.to_string().blue(), "|".blue(), source_line),
            format!("{} {}", padding, "|".blue()),
        ])
    }

    fn get_source_line(&self, file: &str, line: usize) -> Option<String> {
        if line == 0 {
            return None;
        }
        if let Some(source) = self.sources.get(file) {
            return source.lines().nth(line - 1).map(|s| s.to_string());
        }
        if let Ok(content) = fs::read_to_string(file) {
            return content.lines().nth(line - 1).map(|s| s.to_string());
        }
        None
    }

    fn format_summary(&self, files: &[FileReport]) -> String {
        let flow_count: usize = files.iter().map(|f| f.reports.len()).sum();
        let sink_count: usize = files.iter().map(|f| f.reported_sinks.len()).sum();
        let file_count = files.len();

        let files_str = if file_count == 1 {
            format!("{file_count} file")
        } else {
            format!("{file_count} files")
        };
        let sinks_str = if sink_count == 1 {
            format!("{sink_count} sink call")
        } else {
            format!("{sink_count} sink calls")
        };

        if flow_count == 0 {
            format!(
                "\n{} No tainted flows found in {} ({} audited)\n",
                "✓".green().bold(),
                files_str,
                sinks_str
            )
        } else {
            let flows_str = if flow_count == 1 {
                format!("{flow_count} tainted flow")
            } else {
                format!("{flow_count} tainted flows")
            };
            format!(
                "\n{} {} found in {} ({} audited)\n",
                "✗".red().bold(),
                flows_str.red().bold(),
                files_str,
                sinks_str
            )
        }
    }
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{AnalysisSession, Position, SinkRef};

    fn report_for(code: &str) -> FileReport {
        let result = AnalysisSession::new().analyze_source("app.js", code);
        FileReport {
            file: "app.js".to_string(),
            reports: result.reports,
            reported_sinks: result.reported_sinks,
            parse_errors: result
                .parse_errors
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    #[test]
    fn clean_scan_prints_success_summary() {
        colored::control::set_override(false);
        let file = report_for("var x = 1;");
        let output = PrettyFormatter::new().format(&[file]);

        assert!(output.contains("No tainted flows found in 1 file"));
        assert!(output.contains("0 sink calls audited"));
    }

    #[test]
    fn flow_report_shows_source_sink_and_location() {
        colored::control::set_override(false);
        let file = report_for("var cmd = process.argv[2];\neval(cmd);");
        let sources = HashMap::from([(
            "app.js".to_string(),
            "var cmd = process.argv[2];\neval(cmd);".to_string(),
        )]);
        let output = PrettyFormatter::with_sources(sources).format(&[file]);

        assert!(output.contains("tainted flow from `process.argv[2]` to `eval`"));
        assert!(output.contains("--> app.js:1:"));
        assert!(output.contains("var cmd = process.argv[2];"));
        assert!(output.contains("assigned to `cmd`"));
        assert!(output.contains("consumed by sink `eval`"));
        assert!(output.contains("1 tainted flow found in 1 file"));
    }

    #[test]
    fn sink_audit_list_is_opt_in() {
        colored::control::set_override(false);
        let file = FileReport {
            file: "app.js".to_string(),
            reports: Vec::new(),
            reported_sinks: vec![SinkRef::new("eval", "app.js", Position::new(3, 0))],
            parse_errors: Vec::new(),
        };

        let hidden = PrettyFormatter::new().format(std::slice::from_ref(&file));
        assert!(!hidden.contains("sink: eval"));

        let shown = PrettyFormatter::new().show_sinks(true).format(&[file]);
        assert!(shown.contains("sink: eval at app.js:3:0"));
        assert!(shown.contains("1 sink call audited"));
    }

    #[test]
    fn parse_errors_are_surfaced() {
        colored::control::set_override(false);
        let file = report_for("var = = =;");
        let output = PrettyFormatter::new().format(&[file]);

        assert!(output.contains("parse error"));
    }

    #[test]
    fn summary_pluralizes_counts() {
        colored::control::set_override(false);
        let one = report_for("eval(process.argv[2]);");
        let two = report_for("eval(process.argv[3]);");
        let output = PrettyFormatter::new().format(&[one, two]);

        assert!(output.contains("2 tainted flows found in 2 files"));
    }
}
