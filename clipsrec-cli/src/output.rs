use std::fmt::Write as _;

use clipsrec_engine::{DownloadOutcome, RunReport};
use serde::Serialize;

use crate::cli::OutputFormat;

#[derive(Serialize)]
struct Summary<'a> {
    status: &'static str,
    output_dir: String,
    selected: usize,
    succeeded: usize,
    failed: usize,
    bytes: u64,
    failures: Vec<FailureEntry<'a>>,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    tracking_id: &'a str,
    url: &'a str,
    reason: String,
}

fn failures(report: &RunReport) -> Vec<FailureEntry<'_>> {
    report
        .failures()
        .filter_map(|outcome| match outcome {
            DownloadOutcome::Failure {
                tracking_id,
                url,
                error,
            } => Some(FailureEntry {
                tracking_id,
                url,
                reason: error.to_string(),
            }),
            DownloadOutcome::Success { .. } => None,
        })
        .collect()
}

pub fn format_report(report: &RunReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let summary = Summary {
                status: "ok",
                output_dir: report.output_dir.display().to_string(),
                selected: report.selected.len(),
                succeeded: report.succeeded(),
                failed: report.failed(),
                bytes: report.downloaded_bytes(),
                failures: failures(report),
            };
            Ok(serde_json::to_string_pretty(&summary)?)
        }
        OutputFormat::Pretty => Ok(format_pretty(report)),
    }
}

fn format_pretty(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Output: {}", report.output_dir.display());
    let _ = writeln!(
        out,
        "Clips: {} selected, {} downloaded, {} failed ({} bytes)",
        report.selected.len(),
        report.succeeded(),
        report.failed(),
        report.downloaded_bytes()
    );
    for failure in failures(report) {
        let _ = writeln!(
            out,
            "  failed {}: {} ({})",
            failure.tracking_id, failure.reason, failure.url
        );
    }
    out
}

pub fn format_error(message: &str, stage: Option<&str>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "status": "error",
            "stage": stage,
            "message": message,
        })
        .to_string(),
        OutputFormat::Pretty => match stage {
            Some(stage) => format!("Error ({stage}): {message}"),
            None => format!("Error: {message}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        assert_eq!(
            format_error("boom", Some("clip catalog"), OutputFormat::Pretty),
            "Error (clip catalog): boom"
        );
        let json: serde_json::Value =
            serde_json::from_str(&format_error("boom", None, OutputFormat::Json)).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["stage"].is_null());
    }
}
