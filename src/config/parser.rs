//! Configuration parsing from CLI arguments and environment variables
//!
//! Sources are applied lowest priority first: defaults, `.env` file,
//! process environment, command line.

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};
use std::time::Duration;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        // .env never overrides variables already set in the environment
        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;
        let options = &mut config.options;

        if let Some(count) = cli.count {
            options.probe_count = count;
        }
        if let Some(ms) = cli.timeout {
            options.timeout_per_probe = Duration::from_millis(ms);
        }
        if let Some(threshold) = cli.loss_threshold {
            options.loss_threshold = threshold;
        }
        if let Some(ms) = cli.overall_timeout {
            options.overall_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(max) = cli.max_in_flight {
            options.max_in_flight = max;
        }
        if let Some(method) = cli.method {
            options.probe_method = method;
        }
        if let Some(port) = cli.port {
            options.tcp_port = port;
        }
        if cli.no_fallback {
            options.tcp_fallback = false;
        }

        if let Some(servers) = &cli.dns_servers {
            config.dns_servers = servers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            config.doh_provider = None;
        }
        if let Some(url) = &cli.doh {
            config.doh_provider = Some(url.trim().to_string());
        }

        if let Some(format) = cli.format {
            config.output_format = format;
        }

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color || !cli.use_colors() {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let options = &config.options;
    let resolver = config
        .dns_config()
        .map(|dns| dns.name())
        .unwrap_or_else(|e| format!("invalid ({})", e));

    let summary = [
        format!("Probe Method: {}", options.probe_method),
        format!("Probe Count: {}", options.probe_count),
        format!("Per-Probe Timeout: {:?}", options.timeout_per_probe),
        format!("Overall Timeout: {:?}", options.effective_overall_timeout()),
        format!("Loss Threshold: {}", options.loss_threshold),
        format!("Max In Flight: {}", options.max_in_flight),
        format!("TCP Port: {} (fallback: {})", options.tcp_port, options.tcp_fallback),
        format!("Resolver: {}", resolver),
        format!("Output Format: {:?}", config.output_format),
        format!("Color Output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ];

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputFormat;
    use crate::types::{DnsConfig, ProbeMethod};
    use clap::Parser;

    fn config_from(args: &[&str]) -> Config {
        let cli = Cli::parse_from(args);
        let mut config = Config::default();
        ConfigParser::new(cli).apply_cli_overrides(&mut config);
        config
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = config_from(&["netdiag", "--color", "example.com"]);
        let defaults = Config::default();

        assert_eq!(config.options, defaults.options);
        assert!(config.enable_color);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let config = config_from(&[
            "netdiag",
            "--count",
            "10",
            "--timeout",
            "250",
            "--loss-threshold",
            "0.2",
            "--method",
            "tcp",
            "--port",
            "22",
            "--no-fallback",
            "--format",
            "json",
            "--no-color",
            "--verbose",
            "example.com",
        ]);

        assert_eq!(config.options.probe_count, 10);
        assert_eq!(config.options.timeout_per_probe, Duration::from_millis(250));
        assert_eq!(config.options.loss_threshold, 0.2);
        assert_eq!(config.options.probe_method, ProbeMethod::Tcp);
        assert_eq!(config.options.tcp_port, 22);
        assert!(!config.options.tcp_fallback);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(!config.enable_color);
        assert!(config.verbose);
    }

    #[test]
    fn test_dns_overrides() {
        let config = config_from(&["netdiag", "--dns-servers", "1.1.1.1, 8.8.8.8", "example.com"]);
        assert_eq!(config.dns_servers, vec!["1.1.1.1", "8.8.8.8"]);
        assert!(matches!(config.dns_config().unwrap(), DnsConfig::Custom { servers } if servers.len() == 2));

        let config = config_from(&["netdiag", "--doh", "https://dns.google/resolve", "example.com"]);
        assert!(matches!(config.dns_config().unwrap(), DnsConfig::DoH { .. }));
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("Probe Count: 4"));
        assert!(summary.contains("Resolver: system resolver"));
        assert!(summary.contains("Loss Threshold: 0.5"));
    }
}
