//! Reporters for a finished run
//!
//! The list summary always goes to the log. `html` and `json` additionally write
//! a file into the report directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ReporterKind;
use crate::runner::{RunSummary, TestOutcome, TestStatus};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn status_icon(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "✅",
        TestStatus::Failed => "❌",
        TestStatus::TimedOut => "⏱️",
        TestStatus::Skipped => "⏭️",
    }
}

/// One log line per test plus the totals
pub fn log_summary(summary: &RunSummary) {
    for outcome in &summary.outcomes {
        let line = format!(
            "{} {} › {} ({} ms)",
            status_icon(outcome.status),
            outcome.group,
            outcome.title,
            outcome.duration_ms
        );
        match (outcome.status, &outcome.message) {
            (TestStatus::Failed | TestStatus::TimedOut, Some(message)) => {
                error!("{}\n    {}", line, message)
            }
            (TestStatus::Skipped, Some(reason)) => warn!("{} [{}]", line, reason),
            _ => info!("{}", line),
        }
    }

    info!(
        "{} passed, {} failed, {} timed out, {} skipped in {} ms (run {})",
        summary.count(TestStatus::Passed),
        summary.count(TestStatus::Failed),
        summary.count(TestStatus::TimedOut),
        summary.count(TestStatus::Skipped),
        summary.duration_ms,
        summary.run_id
    );
}

/// Write the configured report. Returns the file written, if any.
pub async fn write_report(
    summary: &RunSummary,
    kind: ReporterKind,
    report_dir: &Path,
) -> Result<Option<PathBuf>, ReportError> {
    log_summary(summary);

    let (path, contents) = match kind {
        ReporterKind::List => return Ok(None),
        ReporterKind::Html => (report_dir.join("index.html"), render_html(summary)),
        ReporterKind::Json => (
            report_dir.join("results.json"),
            serde_json::to_string_pretty(summary)?,
        ),
    };

    tokio::fs::create_dir_all(report_dir).await?;
    tokio::fs::write(&path, contents).await?;
    info!("Report written to {}", path.display());
    Ok(Some(path))
}

/// Process exit status: 2 when the report could not be written, 1 when a test
/// failed or timed out, 0 otherwise
pub fn exit_code(summary: &RunSummary, report: &Result<Option<PathBuf>, ReportError>) -> u8 {
    if report.is_err() {
        2
    } else if !summary.success() {
        1
    } else {
        0
    }
}

pub fn render_html(summary: &RunSummary) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Kablamo E2E Report</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2rem; }\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; }\n\
         .passed { color: #1a7f37; } .failed, .timedout { color: #cf222e; } .skipped { color: #9a6700; }\n\
         pre { margin: 0; white-space: pre-wrap; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str("<h1>Kablamo E2E Report</h1>\n");
    html.push_str(&format!(
        "<p>Run <code>{}</code> started {} against environment <code>{}</code> with {} worker(s), {} ms total.</p>\n",
        summary.run_id,
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(&summary.environment),
        summary.workers,
        summary.duration_ms
    ));
    html.push_str(&format!(
        "<p><span class=\"passed\">{} passed</span> · <span class=\"failed\">{} failed</span> · \
         <span class=\"timedout\">{} timed out</span> · <span class=\"skipped\">{} skipped</span></p>\n",
        summary.count(TestStatus::Passed),
        summary.count(TestStatus::Failed),
        summary.count(TestStatus::TimedOut),
        summary.count(TestStatus::Skipped)
    ));

    html.push_str("<table>\n<tr><th>Status</th><th>Group</th><th>Test</th><th>Duration</th><th>Details</th></tr>\n");
    for outcome in &summary.outcomes {
        html.push_str(&render_row(outcome));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn render_row(outcome: &TestOutcome) -> String {
    let class = match outcome.status {
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
        TestStatus::TimedOut => "timedout",
        TestStatus::Skipped => "skipped",
    };
    format!(
        "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{} ms</td><td><pre>{}</pre></td></tr>\n",
        class,
        outcome.status.label(),
        escape_html(&outcome.group),
        escape_html(&outcome.title),
        outcome.duration_ms,
        escape_html(outcome.message.as_deref().unwrap_or(""))
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
