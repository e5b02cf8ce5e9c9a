//! Colored formatter implementation with terminal color support
//!
//! Same layout as the plain formatter, with the diagnosis headline colored
//! by health and probe results colored by kind.

use super::formatter::{
    outcome_cell, resolution_line, summary_row, write_failed, FormattingOptions, OutputFormatter, PlainFormatter,
    SUMMARY_HEADERS,
};
use crate::{
    diagnostics::{Diagnosis, HealthStatus},
    error::Result,
    models::{ProbeOutcome, ProbeSummary},
    report::DiagnosticReport,
    types::ProbeResultKind,
};
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

impl ColorScheme {
    pub fn for_health(&self, health: HealthStatus) -> Color {
        match health {
            HealthStatus::Healthy => self.success,
            HealthStatus::Warning => self.warning,
            HealthStatus::Critical | HealthStatus::Failed => self.error,
        }
    }

    pub fn for_kind(&self, kind: ProbeResultKind) -> Color {
        match kind {
            ProbeResultKind::Success => self.success,
            ProbeResultKind::Timeout => self.warning,
            ProbeResultKind::NetworkError => self.error,
            ProbeResultKind::PermissionDenied => self.muted,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn create_section_header(&self, title: &str) -> String {
        if self.options.enable_color {
            title.bold().color(self.color_scheme.header).to_string()
        } else {
            title.to_string()
        }
    }

    /// Summary table with the loss cell colored; padding is computed on the
    /// plain text so escape codes never skew column widths
    fn create_summary_table(&self, report: &DiagnosticReport, summary: &ProbeSummary) -> Result<String> {
        let row = summary_row(report, summary);
        let widths: Vec<usize> = SUMMARY_HEADERS
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| header.len().max(cell.len()))
            .collect();

        let loss_color = if summary.loss_ratio == 0.0 {
            self.color_scheme.success
        } else if summary.loss_ratio > report.loss_threshold {
            self.color_scheme.error
        } else {
            self.color_scheme.warning
        };

        let rule = self.colorize(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len()), self.color_scheme.border);
        let mut output = String::new();

        let header: Vec<String> = SUMMARY_HEADERS
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:>width$}", h, width = w))
            .collect();
        writeln!(output, "{}", self.bold(&header.join("  "))).map_err(write_failed)?;
        writeln!(output, "{}", rule).map_err(write_failed)?;

        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(idx, (cell, w))| {
                let padded = format!("{:>width$}", cell, width = w);
                match idx {
                    0 => self.colorize(&padded, self.color_scheme.info).to_string(),
                    4 => self.colorize(&padded, loss_color).to_string(),
                    _ => padded,
                }
            })
            .collect();
        writeln!(output, "{}", cells.join("  ")).map_err(write_failed)?;

        Ok(output)
    }

    fn create_outcome_lines(&self, outcomes: &[ProbeOutcome]) -> Result<String> {
        let mut output = String::new();

        for outcome in outcomes {
            let result = format!("{:<18}", outcome_cell(outcome));
            write!(
                output,
                "  #{:<3} {}",
                outcome.sequence + 1,
                self.colorize(&result, self.color_scheme.for_kind(outcome.kind))
            )
            .map_err(write_failed)?;
            if let Some(detail) = &outcome.detail {
                write!(output, " {}", self.colorize(detail, self.color_scheme.muted)).map_err(write_failed)?;
            }
            output.push('\n');
        }

        Ok(output)
    }

    fn create_diagnosis(&self, diagnosis: &Diagnosis) -> Result<String> {
        let mut output = String::new();
        let color = self.color_scheme.for_health(diagnosis.class.health());

        writeln!(
            output,
            "{} {}",
            self.bold("Diagnosis:"),
            self.colorize(diagnosis.class.title(), color).bold()
        )
        .map_err(write_failed)?;
        writeln!(output, "{}", diagnosis.explanation).map_err(write_failed)?;

        if !diagnosis.remediation.is_empty() {
            writeln!(output, "\n{}", self.create_section_header("Suggested next steps")).map_err(write_failed)?;
            for hint in &diagnosis.remediation {
                writeln!(output, "  {} {}", self.colorize("•", self.color_scheme.info), hint).map_err(write_failed)?;
            }
        }

        Ok(output)
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_report(&self, report: &DiagnosticReport) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_report(report);
        }

        let mut output = String::new();

        writeln!(output, "{}", self.create_section_header(&format!("Network Diagnosis: {}", report.target)))
            .map_err(write_failed)?;
        writeln!(
            output,
            "{} {}",
            self.colorize("Resolution:", self.color_scheme.muted),
            resolution_line(&report.resolution)
        )
        .map_err(write_failed)?;
        if report.fallback_used {
            writeln!(
                output,
                "{} ICMP unavailable, fell back to {}",
                self.colorize("Probing:", self.color_scheme.muted),
                self.colorize(report.probe_method.as_str(), self.color_scheme.warning)
            )
            .map_err(write_failed)?;
        }
        if self.options.verbose_mode {
            writeln!(
                output,
                "{} {} ({:.2}s)",
                self.colorize("Run:", self.color_scheme.muted),
                report.run_id,
                report.elapsed.as_secs_f64()
            )
            .map_err(write_failed)?;
        }
        output.push('\n');

        if let Some(summary) = &report.summary {
            output.push_str(&self.create_summary_table(report, summary)?);
            output.push('\n');

            if self.options.show_individual_results && !report.outcomes.is_empty() {
                output.push_str(&self.create_outcome_lines(&report.outcomes)?);
                output.push('\n');
            }
        }

        output.push_str(&self.create_diagnosis(&report.diagnosis)?);
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("ERROR:", self.color_scheme.error).bold(), error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("WARNING:", self.color_scheme.warning).bold(), warning))
    }
}
