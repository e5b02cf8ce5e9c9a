//! Configuration data model and validation

use crate::defaults;
use crate::types::{AppError, DnsConfig, ProbeMethod, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Tunable parameters of one diagnostic invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticOptions {
    /// Number of probes per address (>= 1)
    #[serde(default = "default_probe_count")]
    pub probe_count: u32,

    /// Timeout applied to each probe individually
    #[serde(default = "default_timeout_per_probe")]
    pub timeout_per_probe: Duration,

    /// Loss ratio above which a reachable host is reported as intermittent
    #[serde(default = "default_loss_threshold")]
    pub loss_threshold: f64,

    /// Deadline for a whole probe batch; derived from the per-probe timeout when unset
    #[serde(default)]
    pub overall_timeout: Option<Duration>,

    /// Ceiling on probes in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Timeout for name resolution
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout: Duration,

    /// Primary probing mechanism
    #[serde(default = "default_probe_method")]
    pub probe_method: ProbeMethod,

    /// Port for TCP probes when the target names none
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Re-probe over TCP when ICMP is unavailable to this process
    #[serde(default = "default_tcp_fallback")]
    pub tcp_fallback: bool,

    /// How many resolved addresses may be probed before giving up
    #[serde(default = "default_max_addresses")]
    pub max_addresses: usize,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            probe_count: default_probe_count(),
            timeout_per_probe: default_timeout_per_probe(),
            loss_threshold: default_loss_threshold(),
            overall_timeout: None,
            max_in_flight: default_max_in_flight(),
            resolve_timeout: default_resolve_timeout(),
            probe_method: default_probe_method(),
            tcp_port: default_tcp_port(),
            tcp_fallback: default_tcp_fallback(),
            max_addresses: default_max_addresses(),
        }
    }
}

impl DiagnosticOptions {
    /// Batch deadline: explicit value, or per-probe timeout x count plus scheduling slack
    pub fn effective_overall_timeout(&self) -> Duration {
        self.overall_timeout.unwrap_or_else(|| {
            self.timeout_per_probe
                .saturating_mul(self.probe_count.max(1))
                .saturating_add(defaults::OVERALL_TIMEOUT_SLACK)
        })
    }

    /// Validate the options and return the first violation
    pub fn validate(&self) -> Result<()> {
        if self.probe_count == 0 {
            return Err(AppError::validation("probe_count must be at least 1"));
        }

        if self.probe_count > defaults::MAX_PROBE_COUNT {
            return Err(AppError::validation(format!(
                "probe_count cannot exceed {}",
                defaults::MAX_PROBE_COUNT
            )));
        }

        if self.timeout_per_probe.is_zero() {
            return Err(AppError::validation("timeout_per_probe must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.loss_threshold) {
            return Err(AppError::validation(format!(
                "loss_threshold must be within [0, 1], got {}",
                self.loss_threshold
            )));
        }

        if let Some(overall) = self.overall_timeout {
            if overall < self.timeout_per_probe {
                return Err(AppError::validation(format!(
                    "overall_timeout ({:?}) must not be shorter than timeout_per_probe ({:?})",
                    overall, self.timeout_per_probe
                )));
            }
        }

        if self.max_in_flight == 0 {
            return Err(AppError::validation("max_in_flight must be at least 1"));
        }

        if self.resolve_timeout.is_zero() {
            return Err(AppError::validation("resolve_timeout must be greater than 0"));
        }

        if self.tcp_port == 0 {
            return Err(AppError::validation("tcp_port must be between 1 and 65535"));
        }

        if self.max_addresses == 0 {
            return Err(AppError::validation("max_addresses must be at least 1"));
        }

        Ok(())
    }
}

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Markdown tables, as shown in chat front-ends
    Markdown,
    /// Pretty-printed JSON report
    Json,
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(AppError::parse(format!(
                "Unknown output format '{}', expected text, markdown or json",
                other
            ))),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Engine options
    #[serde(default)]
    pub options: DiagnosticOptions,

    /// Custom DNS server IP addresses
    #[serde(default)]
    pub dns_servers: Vec<String>,

    /// DNS-over-HTTPS provider URL; takes precedence over `dns_servers`
    #[serde(default)]
    pub doh_provider: Option<String>,

    /// How the report is rendered
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            options: DiagnosticOptions::default(),
            dns_servers: Vec::new(),
            doh_provider: None,
            output_format: OutputFormat::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        self.options
            .validate()
            .map_err(|e| AppError::config(e.to_string()))?;

        for dns_server in &self.dns_servers {
            if IpAddr::from_str(dns_server).is_err() {
                return Err(AppError::config(format!("Invalid DNS server IP address: {}", dns_server)));
            }
        }

        if let Some(doh_url) = &self.doh_provider {
            match url::Url::parse(doh_url) {
                Ok(parsed) if parsed.scheme() != "https" => {
                    return Err(AppError::config(format!("DoH URL must use HTTPS: {}", doh_url)));
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(AppError::config(format!("Invalid DoH provider URL '{}': {}", doh_url, e)));
                }
            }
        }

        Ok(())
    }

    /// Resolver selection derived from the settings
    pub fn dns_config(&self) -> Result<DnsConfig> {
        if let Some(url) = &self.doh_provider {
            return Ok(DnsConfig::DoH { url: url.clone() });
        }

        if self.dns_servers.is_empty() {
            return Ok(DnsConfig::System);
        }

        let servers = self
            .dns_servers
            .iter()
            .map(|s| {
                IpAddr::from_str(s)
                    .map_err(|e| AppError::config(format!("Failed to parse DNS server {}: {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DnsConfig::Custom { servers })
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("PROBE_COUNT") {
            self.options.probe_count = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_COUNT value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("PROBE_TIMEOUT_MS") {
            let ms: u64 = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_MS value '{}': {}", value, e)))?;
            self.options.timeout_per_probe = Duration::from_millis(ms);
        }

        if let Ok(value) = std::env::var("LOSS_THRESHOLD") {
            self.options.loss_threshold = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid LOSS_THRESHOLD value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("OVERALL_TIMEOUT_MS") {
            let ms: u64 = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid OVERALL_TIMEOUT_MS value '{}': {}", value, e)))?;
            self.options.overall_timeout = Some(Duration::from_millis(ms));
        }

        if let Ok(value) = std::env::var("MAX_IN_FLIGHT") {
            self.options.max_in_flight = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid MAX_IN_FLIGHT value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("PROBE_METHOD") {
            self.options.probe_method = value
                .parse()
                .map_err(|e: AppError| AppError::config(format!("Invalid PROBE_METHOD: {}", e)))?;
        }

        if let Ok(value) = std::env::var("TCP_PORT") {
            self.options.tcp_port = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCP_PORT value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("TCP_FALLBACK") {
            self.options.tcp_fallback = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCP_FALLBACK value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("DNS_SERVERS") {
            self.dns_servers = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(value) = std::env::var("DOH_PROVIDER") {
            let value = value.trim();
            self.doh_provider = if value.is_empty() { None } else { Some(value.to_string()) };
        }

        if let Ok(value) = std::env::var("ENABLE_COLOR") {
            self.enable_color = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
        }

        if let Ok(value) = std::env::var("OUTPUT_FORMAT") {
            self.output_format = value
                .parse()
                .map_err(|e: AppError| AppError::config(format!("Invalid OUTPUT_FORMAT: {}", e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_probe_count() -> u32 {
    defaults::DEFAULT_PROBE_COUNT
}

fn default_timeout_per_probe() -> Duration {
    defaults::DEFAULT_TIMEOUT_PER_PROBE
}

fn default_loss_threshold() -> f64 {
    defaults::DEFAULT_LOSS_THRESHOLD
}

fn default_max_in_flight() -> usize {
    crate::executor::SystemResources::detect().optimal_concurrency
}

fn default_resolve_timeout() -> Duration {
    defaults::DEFAULT_RESOLVE_TIMEOUT
}

fn default_probe_method() -> ProbeMethod {
    ProbeMethod::Icmp
}

fn default_tcp_port() -> u16 {
    defaults::DEFAULT_TCP_PORT
}

fn default_tcp_fallback() -> bool {
    true
}

fn default_max_addresses() -> usize {
    defaults::DEFAULT_MAX_ADDRESSES
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}
