//! Command-line interface module

pub mod command;

pub use command::{target_from_input, TextCommand};

use crate::{config::EnvManager, models::OutputFormat, types::ProbeMethod};
use clap::Parser;

/// netdiag - diagnose why a host is (or is not) reachable
#[derive(Parser, Debug, Clone)]
#[command(name = "netdiag")]
#[command(version, about, long_about = None, after_long_help = EnvManager::env_help())]
pub struct Cli {
    /// Target host, address or host:port; `USE PING <target>` is accepted too
    #[arg(value_name = "TARGET", num_args = 1.., required = true)]
    pub target: Vec<String>,

    /// Number of probes per address
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Per-probe timeout in milliseconds
    #[arg(short, long, value_parser = parse_millis)]
    pub timeout: Option<u64>,

    /// Loss ratio above which loss is reported as intermittent (0.0-1.0)
    #[arg(short, long, value_parser = parse_ratio)]
    pub loss_threshold: Option<f64>,

    /// Deadline for a whole probe batch in milliseconds
    #[arg(long, value_parser = parse_millis)]
    pub overall_timeout: Option<u64>,

    /// Maximum probes in flight at once
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Probing method (icmp, tcp)
    #[arg(short, long)]
    pub method: Option<ProbeMethod>,

    /// Port for TCP probes when the target names none
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not fall back to TCP when ICMP is not permitted
    #[arg(long)]
    pub no_fallback: bool,

    /// Custom DNS servers (comma-separated)
    #[arg(long)]
    pub dns_servers: Option<String>,

    /// DNS-over-HTTPS provider URL
    #[arg(long)]
    pub doh: Option<String>,

    /// Output format (text, markdown, json)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Show per-probe results and run details
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.count == Some(0) {
            return Err("--count must be at least 1".to_string());
        }

        if self.max_in_flight == Some(0) {
            return Err("--max-in-flight must be at least 1".to_string());
        }

        if self.port == Some(0) {
            return Err("--port must be between 1 and 65535".to_string());
        }

        if self.dns_servers.is_some() && self.doh.is_some() {
            return Err("Cannot specify both --dns-servers and --doh".to_string());
        }

        Ok(())
    }

    /// Target string after unwrapping a `USE PING` command
    pub fn target(&self) -> String {
        target_from_input(&self.target.join(" "))
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse a positive millisecond count
fn parse_millis(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|ms| {
            if ms == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if ms > 300_000 {
                Err("Duration cannot exceed 300000 ms".to_string())
            } else {
                Ok(ms)
            }
        })
}

/// Parse a ratio within [0, 1]
fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("Invalid ratio: {}", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Ratio must be within 0.0 and 1.0, got {}", s))
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_basic() {
        let cli = Cli::parse_from(["netdiag", "example.com"]);
        assert_eq!(cli.target(), "example.com");
        assert!(cli.count.is_none());
        assert!(cli.method.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "netdiag",
            "--count",
            "10",
            "--timeout",
            "500",
            "--loss-threshold",
            "0.25",
            "--overall-timeout",
            "8000",
            "--max-in-flight",
            "2",
            "--method",
            "tcp",
            "--port",
            "8443",
            "--no-fallback",
            "--doh",
            "https://dns.google/resolve",
            "--format",
            "markdown",
            "--no-color",
            "--verbose",
            "example.com",
        ]);

        assert_eq!(cli.count, Some(10));
        assert_eq!(cli.timeout, Some(500));
        assert_eq!(cli.loss_threshold, Some(0.25));
        assert_eq!(cli.overall_timeout, Some(8000));
        assert_eq!(cli.max_in_flight, Some(2));
        assert_eq!(cli.method, Some(ProbeMethod::Tcp));
        assert_eq!(cli.port, Some(8443));
        assert!(cli.no_fallback);
        assert_eq!(cli.format, Some(OutputFormat::Markdown));
        assert!(!cli.use_colors());
        assert!(cli.verbose);
    }

    #[test]
    fn test_use_ping_words() {
        let cli = Cli::parse_from(["netdiag", "USE", "PING", "192.0.2.1"]);
        assert_eq!(cli.target(), "192.0.2.1");

        let cli = Cli::parse_from(["netdiag", "use ping example.com:22"]);
        assert_eq!(cli.target(), "example.com:22");
    }

    #[test]
    fn test_missing_target_is_rejected() {
        assert!(Cli::try_parse_from(["netdiag"]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["netdiag", "--loss-threshold", "1.5", "x"]).is_err());
        assert!(Cli::try_parse_from(["netdiag", "--timeout", "0", "x"]).is_err());
        assert!(Cli::try_parse_from(["netdiag", "--method", "udp", "x"]).is_err());
        assert!(Cli::try_parse_from(["netdiag", "--format", "yaml", "x"]).is_err());
    }

    #[test]
    fn test_cli_validation() {
        let cli = Cli::parse_from(["netdiag", "--color", "--no-color", "x"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["netdiag", "--count", "0", "x"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["netdiag", "--dns-servers", "1.1.1.1", "--doh", "https://dns.google/resolve", "x"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_millis("250"), Ok(250));
        assert!(parse_millis("0").is_err());
        assert!(parse_millis("+5").is_err());
        assert!(parse_millis("0x10").is_err());
        assert!(parse_millis("300001").is_err());
    }

    #[test]
    fn test_ratio_parsing() {
        assert_eq!(parse_ratio("0"), Ok(0.0));
        assert_eq!(parse_ratio("1"), Ok(1.0));
        assert!(parse_ratio("-0.1").is_err());
        assert!(parse_ratio("abc").is_err());
    }

    #[test]
    fn test_use_colors_flags() {
        let cli = Cli::parse_from(["netdiag", "--color", "x"]);
        assert!(cli.use_colors());
    }
}
