//! Probe outcome and summary data models

use crate::types::{ProbeResult, ProbeResultKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use chrono::{DateTime, Utc};

/// One measurement attempt against a resolved address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Sequence number, 0..N-1, fixed at dispatch time
    pub sequence: u32,

    /// What happened
    pub kind: ProbeResultKind,

    /// Send-to-reply time; present only on success
    pub latency: Option<Duration>,

    /// Raw error detail from the transport, if any
    pub detail: Option<String>,

    /// When the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

impl ProbeOutcome {
    /// Build an outcome from a transport result.
    ///
    /// A success without a latency is a transport bug; it is recorded as a
    /// network error rather than fabricating a zero latency.
    pub fn from_result(sequence: u32, result: ProbeResult) -> Self {
        match (result.kind, result.latency) {
            (ProbeResultKind::Success, Some(latency)) => Self::success(sequence, latency),
            (ProbeResultKind::Success, None) => Self {
                sequence,
                kind: ProbeResultKind::NetworkError,
                latency: None,
                detail: Some("transport reported success without a latency".to_string()),
                recorded_at: Utc::now(),
            },
            (kind, _) => Self {
                sequence,
                kind,
                latency: None,
                detail: result.detail,
                recorded_at: Utc::now(),
            },
        }
    }

    pub fn success(sequence: u32, latency: Duration) -> Self {
        Self {
            sequence,
            kind: ProbeResultKind::Success,
            latency: Some(latency),
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn timeout<S: Into<String>>(sequence: u32, detail: S) -> Self {
        Self {
            sequence,
            kind: ProbeResultKind::Timeout,
            latency: None,
            detail: Some(detail.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn network_error<S: Into<String>>(sequence: u32, detail: S) -> Self {
        Self {
            sequence,
            kind: ProbeResultKind::NetworkError,
            latency: None,
            detail: Some(detail.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn permission_denied<S: Into<String>>(sequence: u32, detail: S) -> Self {
        Self {
            sequence,
            kind: ProbeResultKind::PermissionDenied,
            latency: None,
            detail: Some(detail.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ProbeResultKind::Success
    }

    /// Latency in milliseconds, if any
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|d| d.as_secs_f64() * 1000.0)
    }
}

/// Latency distribution over successful probes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
    /// Population standard deviation, as ping reports it
    pub mdev: Duration,
}

impl LatencyStats {
    pub fn min_ms(&self) -> f64 {
        self.min.as_secs_f64() * 1000.0
    }

    pub fn avg_ms(&self) -> f64 {
        self.avg.as_secs_f64() * 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max.as_secs_f64() * 1000.0
    }

    pub fn mdev_ms(&self) -> f64 {
        self.mdev.as_secs_f64() * 1000.0
    }
}

/// Summary statistics over one probe batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    /// Number of probes attempted
    pub attempted: u32,

    /// Number of successful probes
    pub succeeded: u32,

    /// (attempted - succeeded) / attempted, full precision
    pub loss_ratio: f64,

    /// Absent when no probe succeeded
    pub latency: Option<LatencyStats>,

    /// Multiset of non-success kinds seen
    pub failure_kinds: BTreeMap<ProbeResultKind, u32>,
}

impl ProbeSummary {
    /// Number of failed probes
    pub fn failed(&self) -> u32 {
        self.attempted.saturating_sub(self.succeeded)
    }

    /// Count of a given non-success kind
    pub fn count_of(&self, kind: ProbeResultKind) -> u32 {
        self.failure_kinds.get(&kind).copied().unwrap_or(0)
    }

    /// True if at least one probe ran and every attempt ended in `kind`
    pub fn all_failed_with(&self, kind: ProbeResultKind) -> bool {
        self.attempted > 0 && self.succeeded == 0 && self.count_of(kind) == self.attempted
    }

    /// Loss as a percentage rounded to one decimal place (presentation only)
    pub fn loss_percent(&self) -> f64 {
        (self.loss_ratio * 1000.0).round() / 10.0
    }

    /// Success rate as a percentage (0.0-100.0)
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.attempted as f64) * 100.0
        }
    }
}
