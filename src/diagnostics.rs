//! Root-cause diagnosis
//!
//! A fixed decision table maps the resolution outcome and the probe summary
//! to exactly one [`DiagnosisClass`]. Rules are evaluated top to bottom and
//! the first match wins:
//!
//! | # | Condition | Class |
//! |---|-----------|-------|
//! | 1 | resolution failed: name not found | `DnsFailure` |
//! | 2 | resolution failed: timeout | `DnsTimeout` |
//! | 3 | resolution failed: invalid format | `InvalidTarget` |
//! | 4 | no probes attempted | `NoData` |
//! | 5 | no success, all permission denied | `ProbingUnavailable` |
//! | 6 | no success, all network errors | `HostUnreachable` |
//! | 7 | no success, all timeouts | `HostSilentOrFiltered` |
//! | 8 | no success, mixed failures | `Inconclusive` |
//! | 9 | loss above threshold | `IntermittentLoss` |
//! | 10 | no loss | `Healthy` |
//! | 11 | loss at or below threshold | `MinorLoss` |

use crate::{
    models::ProbeSummary,
    types::{ProbeMethod, ProbeResultKind, ResolutionError, ResolvedAddress},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root-cause categories, one per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosisClass {
    DnsFailure,
    DnsTimeout,
    InvalidTarget,
    NoData,
    ProbingUnavailable,
    HostUnreachable,
    HostSilentOrFiltered,
    Inconclusive,
    IntermittentLoss,
    Healthy,
    MinorLoss,
}

impl DiagnosisClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DnsFailure => "DnsFailure",
            Self::DnsTimeout => "DnsTimeout",
            Self::InvalidTarget => "InvalidTarget",
            Self::NoData => "NoData",
            Self::ProbingUnavailable => "ProbingUnavailable",
            Self::HostUnreachable => "HostUnreachable",
            Self::HostSilentOrFiltered => "HostSilentOrFiltered",
            Self::Inconclusive => "Inconclusive",
            Self::IntermittentLoss => "IntermittentLoss",
            Self::Healthy => "Healthy",
            Self::MinorLoss => "MinorLoss",
        }
    }

    /// Short headline for human-readable output
    pub fn title(&self) -> &'static str {
        match self {
            Self::DnsFailure => "Name resolution failed",
            Self::DnsTimeout => "Name resolution timed out",
            Self::InvalidTarget => "Invalid target",
            Self::NoData => "No probe data",
            Self::ProbingUnavailable => "Probing unavailable",
            Self::HostUnreachable => "Host unreachable",
            Self::HostSilentOrFiltered => "Host silent or filtered",
            Self::Inconclusive => "Inconclusive",
            Self::IntermittentLoss => "Intermittent packet loss",
            Self::Healthy => "Healthy",
            Self::MinorLoss => "Minor packet loss",
        }
    }

    pub fn health(&self) -> HealthStatus {
        match self {
            Self::Healthy => HealthStatus::Healthy,
            Self::MinorLoss | Self::NoData | Self::ProbingUnavailable | Self::Inconclusive => HealthStatus::Warning,
            Self::IntermittentLoss | Self::HostSilentOrFiltered | Self::DnsTimeout => HealthStatus::Critical,
            Self::DnsFailure | Self::InvalidTarget | Self::HostUnreachable => HealthStatus::Failed,
        }
    }
}

impl fmt::Display for DiagnosisClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health levels used to color output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Target reachable without loss
    Healthy,
    /// Degraded or unknown
    Warning,
    /// Significant loss or no replies
    Critical,
    /// Target cannot be reached at all
    Failed,
}

/// Selected class with its explanation and suggested next steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub class: DiagnosisClass,
    pub explanation: String,
    pub remediation: Vec<String>,
}

/// Everything the decision table looks at
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    /// Addresses from the resolver, or why there are none
    pub resolution: std::result::Result<&'a [ResolvedAddress], &'a ResolutionError>,
    /// Address whose batch is reported
    pub selected: Option<&'a ResolvedAddress>,
    /// Summary of that batch; absent when probing never ran
    pub summary: Option<&'a ProbeSummary>,
    /// Mechanism that produced the summary
    pub method: ProbeMethod,
}

/// Select the diagnosis class; first matching rule wins
pub fn classify(
    resolution: std::result::Result<(), &ResolutionError>,
    summary: Option<&ProbeSummary>,
    loss_threshold: f64,
) -> DiagnosisClass {
    if let Err(error) = resolution {
        return match error {
            ResolutionError::NameNotFound { .. } => DiagnosisClass::DnsFailure,
            ResolutionError::ResolutionTimeout { .. } => DiagnosisClass::DnsTimeout,
            ResolutionError::InvalidFormat { .. } => DiagnosisClass::InvalidTarget,
        };
    }

    let summary = match summary {
        Some(summary) if summary.attempted > 0 => summary,
        _ => return DiagnosisClass::NoData,
    };

    if summary.succeeded == 0 {
        return if summary.all_failed_with(ProbeResultKind::PermissionDenied) {
            DiagnosisClass::ProbingUnavailable
        } else if summary.all_failed_with(ProbeResultKind::NetworkError) {
            DiagnosisClass::HostUnreachable
        } else if summary.all_failed_with(ProbeResultKind::Timeout) {
            DiagnosisClass::HostSilentOrFiltered
        } else {
            DiagnosisClass::Inconclusive
        };
    }

    if summary.loss_ratio > loss_threshold {
        DiagnosisClass::IntermittentLoss
    } else if summary.loss_ratio == 0.0 {
        DiagnosisClass::Healthy
    } else {
        DiagnosisClass::MinorLoss
    }
}

/// Classify the evidence and explain the result
pub fn diagnose(evidence: &Evidence<'_>, loss_threshold: f64) -> Diagnosis {
    let class = classify(evidence.resolution.map(|_| ()), evidence.summary, loss_threshold);

    Diagnosis {
        class,
        explanation: explain(class, evidence, loss_threshold),
        remediation: remediation(class, evidence.method),
    }
}

/// Percentage with at most one decimal place
fn percent(ratio: f64) -> String {
    format!("{}%", (ratio * 1000.0).round() / 10.0)
}

fn explain(class: DiagnosisClass, evidence: &Evidence<'_>, loss_threshold: f64) -> String {
    let address = evidence
        .selected
        .map(|a| a.to_string())
        .unwrap_or_else(|| "the resolved address".to_string());
    let method = evidence.method;
    let (attempted, succeeded, loss) = evidence
        .summary
        .map(|s| (s.attempted, s.succeeded, s.loss_ratio))
        .unwrap_or((0, 0, 0.0));

    match (class, evidence.resolution) {
        (DiagnosisClass::DnsFailure, Err(ResolutionError::NameNotFound { name, detail })) => format!(
            "The name '{}' could not be resolved ({}). No probes were sent; the name may be misspelled, \
             the domain may not exist, or the resolver cannot see it.",
            name, detail
        ),
        (DiagnosisClass::DnsTimeout, Err(ResolutionError::ResolutionTimeout { name, timeout })) => format!(
            "Resolving '{}' did not finish within {:?}. No probes were sent; the DNS server is slow or unreachable.",
            name, timeout
        ),
        (DiagnosisClass::InvalidTarget, Err(ResolutionError::InvalidFormat { input, reason })) => format!(
            "'{}' is not a valid host name or address: {}. No probes were sent.",
            input, reason
        ),
        (DiagnosisClass::NoData, _) => format!(
            "The target resolved but no probes were run against {}, so reachability is unknown.",
            address
        ),
        (DiagnosisClass::ProbingUnavailable, _) => format!(
            "All {} {} probes to {} were refused by the local system; this process is not allowed to send {} probes. \
             Nothing is known about the remote host.",
            attempted, method, address, method
        ),
        (DiagnosisClass::HostUnreachable, _) => format!(
            "All {} probes to {} failed with a network error; the host or an intermediate router is likely down \
             or blackholing traffic.",
            attempted, address
        ),
        (DiagnosisClass::HostSilentOrFiltered, _) => format!(
            "All {} probes to {} timed out without any reply; the host is down, or a firewall is silently \
             dropping {} traffic.",
            attempted, address, method
        ),
        (DiagnosisClass::Inconclusive, _) => {
            let kinds = evidence
                .summary
                .map(|s| {
                    s.failure_kinds
                        .iter()
                        .map(|(kind, count)| format!("{} {}", count, kind))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!(
                "None of the {} probes to {} succeeded and the failures were mixed ({}); no single cause stands out.",
                attempted, address, kinds
            )
        }
        (DiagnosisClass::IntermittentLoss, _) => format!(
            "{} of {} probes to {} succeeded ({} loss, above the {} threshold); the path is dropping traffic \
             intermittently.",
            succeeded,
            attempted,
            address,
            percent(loss),
            percent(loss_threshold)
        ),
        (DiagnosisClass::Healthy, _) => format!("All {} probes to {} succeeded with no loss.", attempted, address),
        (DiagnosisClass::MinorLoss, _) => format!(
            "{} of {} probes to {} succeeded ({} loss, within the {} threshold); occasional loss is common on \
             busy links.",
            succeeded,
            attempted,
            address,
            percent(loss),
            percent(loss_threshold)
        ),
        // Resolution classes always come with the matching error
        (class, _) => format!("{}.", class.title()),
    }
}

fn remediation(class: DiagnosisClass, method: ProbeMethod) -> Vec<String> {
    let hints: &[&str] = match class {
        DiagnosisClass::DnsFailure => &[
            "Check the spelling of the host name",
            "Query another resolver (for example with --dns-servers 1.1.1.1 or --doh)",
            "Confirm the domain is registered and has A/AAAA records",
        ],
        DiagnosisClass::DnsTimeout => &[
            "Check that the configured DNS servers are reachable",
            "Retry with a different resolver or DNS-over-HTTPS",
        ],
        DiagnosisClass::InvalidTarget => &[
            "Pass a bare host name, an IPv4/IPv6 address, or host:port",
        ],
        DiagnosisClass::NoData => &["Run again with a probe count of at least 1"],
        DiagnosisClass::ProbingUnavailable => &[
            "Install ping or grant it CAP_NET_RAW (or run with sufficient privileges)",
            "Use TCP probing instead (--method tcp)",
        ],
        DiagnosisClass::HostUnreachable => &[
            "Check that the host is powered on and connected",
            "Check local routes and the default gateway",
            "Try a traceroute to see where traffic stops",
        ],
        DiagnosisClass::HostSilentOrFiltered => match method {
            ProbeMethod::Icmp => &[
                "Many hosts and firewalls drop ICMP echo; try TCP probing (--method tcp)",
                "Check firewall rules between here and the host",
            ],
            ProbeMethod::Tcp => &[
                "Check that a service listens on the probed port",
                "Check firewall rules between here and the host",
            ],
        },
        DiagnosisClass::Inconclusive => &[
            "Repeat the diagnosis with more probes",
            "Compare with another probing method",
        ],
        DiagnosisClass::IntermittentLoss => &[
            "Check for congestion or a flaky link (Wi-Fi, VPN, overloaded uplink)",
            "Repeat with more probes to confirm the loss rate",
        ],
        DiagnosisClass::Healthy => &[],
        DiagnosisClass::MinorLoss => &["Repeat later if the loss persists"],
    };

    hints.iter().map(|h| h.to_string()).collect()
}
