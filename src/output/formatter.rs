//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    diagnostics::Diagnosis,
    error::{AppError, Result},
    models::{ProbeOutcome, ProbeSummary},
    report::{DiagnosticReport, ResolutionOutcome},
};
use std::fmt::Write as _;

/// Renders a diagnostic report for people or programs
pub trait OutputFormatter {
    /// Format a complete report
    fn format_report(&self, report: &DiagnosticReport) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show resolution details and timing
    pub verbose_mode: bool,
    /// Show the per-probe table
    pub show_individual_results: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            show_individual_results: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: header.len(),
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Headers of the summary table
pub(crate) const SUMMARY_HEADERS: [&str; 9] = [
    "Type", "Host", "Sent", "Received", "Loss", "Min (ms)", "Avg (ms)", "Max (ms)", "Mdev (ms)",
];

/// Failed outcome details shown at most
pub(crate) const MAX_ERROR_DETAILS: usize = 3;

pub(crate) fn write_failed(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format report: {}", e))
}

/// Milliseconds with ping's three decimals
pub(crate) fn format_ms(ms: f64) -> String {
    format!("{:.3}", ms)
}

/// Loss rounded to one decimal, trailing zero dropped ("50%", "33.3%")
pub(crate) fn format_loss(summary: &ProbeSummary) -> String {
    format!("{}%", summary.loss_percent())
}

/// Cells of the summary row; `-` where latency statistics are absent
pub(crate) fn summary_row(report: &DiagnosticReport, summary: &ProbeSummary) -> RowData {
    let host = report
        .selected_address
        .map(|a| a.to_string())
        .unwrap_or_else(|| report.target.clone());

    let (min, avg, max, mdev) = match &summary.latency {
        Some(l) => (
            format_ms(l.min_ms()),
            format_ms(l.avg_ms()),
            format_ms(l.max_ms()),
            format_ms(l.mdev_ms()),
        ),
        None => ("-".into(), "-".into(), "-".into(), "-".into()),
    };

    vec![
        report.probe_method.to_string(),
        host,
        summary.attempted.to_string(),
        summary.succeeded.to_string(),
        format_loss(summary),
        min,
        avg,
        max,
        mdev,
    ]
}

/// Latency in ms, or the failure kind
pub(crate) fn outcome_cell(outcome: &ProbeOutcome) -> String {
    match outcome.latency_ms() {
        Some(ms) if outcome.is_success() => format_ms(ms),
        _ => outcome.kind.to_string(),
    }
}

/// First raw error details of a batch
pub(crate) fn error_details(outcomes: &[ProbeOutcome]) -> Vec<&str> {
    outcomes
        .iter()
        .filter(|o| !o.is_success())
        .filter_map(|o| o.detail.as_deref())
        .take(MAX_ERROR_DETAILS)
        .collect()
}

/// One-line description of the resolution step
pub(crate) fn resolution_line(resolution: &ResolutionOutcome) -> String {
    match resolution {
        ResolutionOutcome::Resolved { addresses } => {
            let rendered: Vec<String> = addresses.iter().map(|a| a.ip.to_string()).collect();
            format!("resolved to {}", rendered.join(", "))
        }
        ResolutionOutcome::Failed { detail, .. } => format!("failed: {}", detail),
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&widths));
            output.push('\n');
        }

        output
    }

    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let content = rows.iter().filter_map(|r| r.get(idx)).map(String::len).max().unwrap_or(0);
                content.max(column.min_width).min(column.max_width)
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map(|c| c.alignment).unwrap_or(Alignment::Left);
            let padded = self.align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
                row.push_str(&padded);
                row.push_str(" |");
            } else {
                row.push_str(&padded);
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::from("+");
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
        border
    }

    /// Align text within specified width, truncating when too long
    fn align_text(&self, text: &str, width: usize, alignment: Alignment) -> String {
        if text.len() >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - text.len();
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        }
    }

    pub(crate) fn summary_table(&self, report: &DiagnosticReport, summary: &ProbeSummary) -> String {
        let columns = SUMMARY_HEADERS
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let alignment = if idx < 2 { Alignment::Left } else { Alignment::Right };
                Column::new(header, alignment, 45)
            })
            .collect();

        let format = TableFormat {
            columns,
            show_borders: self.options.table_borders,
            show_header: true,
        };
        self.create_table(&format, &[summary_row(report, summary)])
    }

    pub(crate) fn outcomes_table(&self, outcomes: &[ProbeOutcome]) -> String {
        let detail_width = self.options.max_width.saturating_sub(40).max(20);
        let format = TableFormat {
            columns: vec![
                Column::new("Attempt", Alignment::Right, 8),
                Column::new("Result", Alignment::Left, 20),
                Column::new("Detail", Alignment::Left, detail_width),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = outcomes
            .iter()
            .map(|o| {
                vec![
                    (o.sequence + 1).to_string(),
                    outcome_cell(o),
                    o.detail.clone().unwrap_or_default(),
                ]
            })
            .collect();

        self.create_table(&format, &rows)
    }

    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(write_failed)?;
        writeln!(output, "  {}  ", title).map_err(write_failed)?;
        write!(output, "{}", border).map_err(write_failed)?;

        Ok(output)
    }

    fn format_diagnosis(&self, diagnosis: &Diagnosis) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Diagnosis: {} ({})", diagnosis.class.title(), diagnosis.class).map_err(write_failed)?;
        writeln!(output, "{}", diagnosis.explanation).map_err(write_failed)?;

        if !diagnosis.remediation.is_empty() {
            writeln!(output, "\nSuggested next steps:").map_err(write_failed)?;
            for hint in &diagnosis.remediation {
                writeln!(output, "  - {}", hint).map_err(write_failed)?;
            }
        }

        Ok(output)
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_report(&self, report: &DiagnosticReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header(&format!("Network Diagnosis: {}", report.target))?);
        output.push_str("\n\n");

        writeln!(output, "Resolution: {}", resolution_line(&report.resolution)).map_err(write_failed)?;
        if report.fallback_used {
            writeln!(output, "Probing:    ICMP unavailable, fell back to {}", report.probe_method)
                .map_err(write_failed)?;
        }
        if self.options.verbose_mode {
            writeln!(output, "Run:        {} ({:.2}s)", report.run_id, report.elapsed.as_secs_f64())
                .map_err(write_failed)?;
        }
        output.push('\n');

        if let Some(summary) = &report.summary {
            output.push_str(&self.summary_table(report, summary));
            output.push('\n');

            if self.options.show_individual_results && !report.outcomes.is_empty() {
                output.push_str(&self.outcomes_table(&report.outcomes));
                output.push('\n');
            }
        }

        output.push_str(&self.format_diagnosis(&report.diagnosis)?);
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }
}
