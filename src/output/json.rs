//! JSON rendering of the full report

use super::formatter::OutputFormatter;
use crate::{error::Result, report::DiagnosticReport};

/// Serializes reports for other programs
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &DiagnosticReport) -> Result<String> {
        if self.pretty {
            report.to_json_pretty()
        } else {
            report.to_json()
        }
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(serde_json::json!({ "error": error }).to_string())
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(serde_json::json!({ "warning": warning }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::formatter::tests::{dns_failure_report, lossy_report};

    #[test]
    fn test_compact_json_is_single_line() {
        let output = JsonFormatter::new(false).format_report(&lossy_report()).unwrap();
        assert!(!output.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["diagnosis"]["class"], "IntermittentLoss");
        assert_eq!(value["fallback_used"], true);
        assert_eq!(value["summary"]["attempted"], 4);
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_failed_resolution_json() {
        let output = JsonFormatter::default().format_report(&dns_failure_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["resolution"]["status"], "failed");
        assert_eq!(value["resolution"]["kind"], "NameNotFound");
        assert!(value["summary"].is_null());
    }

    #[test]
    fn test_error_is_json() {
        let output = JsonFormatter::default().format_error("boom").unwrap();
        assert_eq!(output, r#"{"error":"boom"}"#);
    }
}
