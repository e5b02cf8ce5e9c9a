//! Data models for the diagnostic engine

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, DiagnosticOptions, OutputFormat};
pub use metrics::{LatencyStats, ProbeOutcome, ProbeSummary};
