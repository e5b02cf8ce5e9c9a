//! Network Reachability Diagnostics
//!
//! Resolves a target, sends a batch of reachability probes, summarizes
//! latency and loss, and explains the most likely root cause of what was
//! observed (DNS failure, unreachable host, filtering, intermittent loss).

pub mod app;
pub mod cli;
pub mod config;
pub mod client;
pub mod dns;
pub mod error;
pub mod logging;
pub mod stats;
pub mod diagnostics;
pub mod executor;
pub mod output;
pub mod models;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use app::{run_diagnostic, DiagnosticEngine};
pub use error::{AppError, Result};
pub use models::{Config, DiagnosticOptions, LatencyStats, OutputFormat, ProbeOutcome, ProbeSummary};
pub use diagnostics::{diagnose, Diagnosis, DiagnosisClass};
pub use report::{DiagnosticReport, ReportBuilder, ResolutionOutcome};
pub use stats::summarize;
pub use types::{ProbeMethod, ProbeResult, ProbeResultKind, ResolutionError, ResolvedAddress, Target};
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, MarkdownFormatter, JsonFormatter};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata injected by build.rs
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PROBE_COUNT: u32 = 4;
    pub const MAX_PROBE_COUNT: u32 = 100;
    pub const DEFAULT_TIMEOUT_PER_PROBE: Duration = Duration::from_secs(1);
    pub const DEFAULT_LOSS_THRESHOLD: f64 = 0.5;
    /// Added to probe_count x timeout_per_probe when no overall timeout is set
    pub const OVERALL_TIMEOUT_SLACK: Duration = Duration::from_millis(500);
    pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_TCP_PORT: u16 = 443;
    pub const DEFAULT_MAX_ADDRESSES: usize = 2;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_DOH_PROVIDERS: &[&str] = &[
        "https://cloudflare-dns.com/dns-query",
        "https://dns.google/resolve",
    ];
}
