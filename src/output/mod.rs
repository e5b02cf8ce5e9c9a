//! Output formatting and display system
//!
//! Presentation adapters for [`DiagnosticReport`](crate::report::DiagnosticReport):
//! plain and colored terminal text, markdown tables and JSON.

mod colored;
mod formatter;
mod json;
mod markdown;

pub use colored::{ColorScheme, ColoredFormatter};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};
pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;

use crate::models::{Config, OutputFormat};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter for the requested format and terminal preferences
    pub fn create_formatter(format: OutputFormat, enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            show_individual_results: verbose,
            ..FormattingOptions::default()
        };

        match format {
            OutputFormat::Markdown => Box::new(MarkdownFormatter::new()),
            OutputFormat::Json => Box::new(JsonFormatter::new(true)),
            OutputFormat::Text if enable_color => Box::new(ColoredFormatter::new(options)),
            OutputFormat::Text => Box::new(PlainFormatter::new(options)),
        }
    }

    /// Formatter selected by the application configuration
    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.output_format, config.enable_color, config.verbose)
    }
}
