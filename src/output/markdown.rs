//! Markdown rendering for chat and document embedding
//!
//! Produces the summary table, a per-attempt latency table, up to three raw
//! error details and the diagnosis, in GitHub-flavored markdown.

use super::formatter::{error_details, outcome_cell, summary_row, write_failed, OutputFormatter, SUMMARY_HEADERS};
use crate::{
    error::Result,
    report::{DiagnosticReport, ResolutionOutcome},
};
use std::fmt::Write as _;

/// Renders reports as markdown tables
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self
    }
}

/// Cells may not contain pipes or line breaks
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn table_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |", escaped.join(" | "))
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &DiagnosticReport) -> Result<String> {
        let mut output = String::new();

        match (&report.resolution, &report.summary) {
            (ResolutionOutcome::Failed { detail, .. }, _) => {
                writeln!(output, "| Type | Host | Note |").map_err(write_failed)?;
                writeln!(output, "|---|---|---|").map_err(write_failed)?;
                writeln!(output, "{}", table_row(&["DNS".to_string(), report.target.clone(), detail.clone()]))
                    .map_err(write_failed)?;
            }
            (ResolutionOutcome::Resolved { .. }, Some(summary)) => {
                writeln!(output, "| {} |", SUMMARY_HEADERS.join(" | ")).map_err(write_failed)?;
                writeln!(output, "|---|---|---:|---:|---:|---:|---:|---:|---:|").map_err(write_failed)?;
                writeln!(output, "{}", table_row(&summary_row(report, summary))).map_err(write_failed)?;

                if report.outcomes.len() > 1 {
                    writeln!(output, "\n| Attempt | Latency (ms) |").map_err(write_failed)?;
                    writeln!(output, "|---:|---:|").map_err(write_failed)?;
                    for outcome in &report.outcomes {
                        writeln!(
                            output,
                            "{}",
                            table_row(&[(outcome.sequence + 1).to_string(), outcome_cell(outcome)])
                        )
                        .map_err(write_failed)?;
                    }
                }

                let errors = error_details(&report.outcomes);
                if !errors.is_empty() {
                    writeln!(output, "\n| Errors |").map_err(write_failed)?;
                    writeln!(output, "|---|").map_err(write_failed)?;
                    for detail in errors {
                        writeln!(output, "| {} |", escape_cell(detail)).map_err(write_failed)?;
                    }
                }
            }
            (ResolutionOutcome::Resolved { .. }, None) => {
                writeln!(output, "| Type | Host | Note |").map_err(write_failed)?;
                writeln!(output, "|---|---|---|").map_err(write_failed)?;
                writeln!(
                    output,
                    "{}",
                    table_row(&[report.probe_method.to_string(), report.target.clone(), "no probes sent".to_string()])
                )
                .map_err(write_failed)?;
            }
        }

        if report.fallback_used {
            writeln!(output, "\n_ICMP was unavailable; probed over {} instead._", report.probe_method)
                .map_err(write_failed)?;
        }

        let diagnosis = &report.diagnosis;
        writeln!(output, "\n**Diagnosis: {}** ({})", diagnosis.class.title(), diagnosis.class).map_err(write_failed)?;
        writeln!(output, "\n{}", diagnosis.explanation).map_err(write_failed)?;

        if !diagnosis.remediation.is_empty() {
            output.push('\n');
            for hint in &diagnosis.remediation {
                writeln!(output, "- {}", hint).map_err(write_failed)?;
            }
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("**Error:** {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("> **Warning:** {}", warning))
    }
}
