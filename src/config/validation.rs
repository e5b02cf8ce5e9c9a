//! Configuration validation utilities and rules
//!
//! Hard errors come from [`Config::validate`]; this module adds advisory
//! warnings about settings that are legal but likely to mislead.

use crate::{
    error::{AppError, Result},
    models::Config,
    types::ProbeMethod,
};
use colored::*;
use std::net::IpAddr;
use std::time::Duration;

/// Per-probe timeouts below this rarely survive a real network round trip
const SHORT_TIMEOUT: Duration = Duration::from_millis(50);

/// Configuration validator with advisory checks
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_probe_settings(config));
        warnings.extend(Self::validate_dns_servers(&config.dns_servers)?);
        if let Some(provider) = &config.doh_provider {
            warnings.extend(Self::validate_doh_provider(provider)?);
        }

        Ok(warnings)
    }

    /// Probe count, timeout and threshold combinations
    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let options = &config.options;
        let mut warnings = Vec::new();

        if options.timeout_per_probe < SHORT_TIMEOUT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Per-probe timeout of {}ms may report healthy hosts as silent",
                    options.timeout_per_probe.as_millis()
                ),
            ));
        }

        if options.probe_count == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "A single probe cannot distinguish intermittent loss from an outage".to_string(),
            ));
        }

        if options.loss_threshold == 0.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Loss threshold 0: any lost probe is reported as intermittent loss".to_string(),
            ));
        } else if options.loss_threshold == 1.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Loss threshold 1: partial loss is always reported as minor".to_string(),
            ));
        }

        if options.max_in_flight < options.probe_count as usize {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Only {} of {} probes run concurrently; the batch takes longer",
                    options.max_in_flight, options.probe_count
                ),
            ));
        }

        if options.probe_method == ProbeMethod::Tcp && options.tcp_fallback && config.debug {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "TCP fallback has no effect when probing over TCP".to_string(),
            ));
        }

        warnings
    }

    /// Validate DNS server addresses
    fn validate_dns_servers(servers: &[String]) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        for server in servers {
            let ip = server
                .parse::<IpAddr>()
                .map_err(|e| AppError::config(format!("Invalid DNS server IP '{}': {}", server, e)))?;

            if ip.is_loopback() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("DNS server {} is loopback address (localhost)", ip),
                ));
            } else if matches!(ip, IpAddr::V4(v4) if v4.is_private()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("DNS server {} is in private IP range, ensure it's accessible", ip),
                ));
            }
        }

        Ok(warnings)
    }

    /// Validate the DNS-over-HTTPS provider
    fn validate_doh_provider(provider: &str) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let parsed = url::Url::parse(provider)
            .map_err(|e| AppError::config(format!("Invalid DoH provider URL '{}': {}", provider, e)))?;

        if parsed.scheme() != "https" {
            return Err(AppError::config(format!("DoH provider must use HTTPS: {}", provider)));
        }

        if Self::is_known_doh_provider(&parsed) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Using well-known DoH provider: {}", parsed.host_str().unwrap_or("unknown")),
            ));
        }

        // JSON DoH endpoints live under one of these paths
        if !parsed.path().contains("dns-query") && !parsed.path().contains("resolve") {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "DoH provider '{}' may not use standard path (expected 'dns-query' or 'resolve')",
                    provider
                ),
            ));
        }

        Ok(warnings)
    }

    fn is_known_doh_provider(url: &url::Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        crate::defaults::DEFAULT_DOH_PROVIDERS
            .iter()
            .filter_map(|known| url::Url::parse(known).ok())
            .filter_map(|known| known.host_str().map(str::to_string))
            .chain(["dns.quad9.net".to_string(), "doh.opendns.com".to_string()])
            .any(|known| host == known)
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()).bold(), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
