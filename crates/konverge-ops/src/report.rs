//! Rendering of reconciliation results for humans and for tools.

use std::path::Path;

use konverge_resolver::conflict::{ConflictReport, Diagnostic};
use konverge_resolver::pipeline::{ReconcileFailure, Stage};
use serde::Serialize;

/// How results are reported on the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    #[default]
    Human,
    /// One JSON document on stdout.
    Json,
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diagnostics: &'a [Diagnostic],
}

fn print_json(message: &JsonMessage<'_>) {
    match serde_json::to_string_pretty(message) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!("failed to serialize diagnostics: {e}"),
    }
}

/// Report a successful run.
pub fn print_success(format: MessageFormat, output: Option<&Path>) {
    if format == MessageFormat::Json {
        print_json(&JsonMessage {
            success: true,
            stage: Some(Stage::Done),
            output,
            cancelled: false,
            error: None,
            diagnostics: &[],
        });
    }
}

/// Report a failed run with every diagnostic it collected.
pub fn print_failure(format: MessageFormat, failure: &ReconcileFailure) {
    let empty = ConflictReport::new();
    let report = failure.report().unwrap_or(&empty);
    match format {
        MessageFormat::Json => print_json(&JsonMessage {
            success: false,
            stage: Some(failure.stage),
            output: None,
            cancelled: failure.is_cancelled(),
            error: report.is_empty().then(|| failure.to_string()),
            diagnostics: &report.diagnostics,
        }),
        MessageFormat::Human => {
            if failure.is_cancelled() {
                konverge_util::progress::status_warn("Cancelled", &failure.to_string());
                return;
            }
            konverge_util::progress::status_error("error", &failure.to_string());
            if !report.is_empty() {
                eprint!("{report}");
            }
        }
    }
}
