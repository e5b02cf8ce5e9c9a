//! Type definitions shared across the engine

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::OnceLock;
use std::time::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::error::{AppError, Result};

/// Characters accepted in a target: hostnames, IPv4/IPv6 literals, zone ids, brackets and ports
const ALLOWED_TARGET_PATTERN: &str = r"^[A-Za-z0-9\.\-:%_\[\]]+$";

fn allowed_target() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ALLOWED_TARGET_PATTERN).expect("target pattern is valid"))
}

/// The user-supplied target, sanitised and split into host and optional port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    raw: String,
    host: String,
    port: Option<u16>,
    /// Interface zone of a scoped IPv6 literal (`fe80::1%eth0`)
    zone: Option<String>,
}

impl Target {
    /// Parse a raw target string.
    ///
    /// Accepts `host`, `host:port`, IPv4/IPv6 literals and `[v6]:port`.
    /// Surrounding whitespace is trimmed.
    pub fn parse(input: &str) -> std::result::Result<Self, ResolutionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ResolutionError::InvalidFormat {
                input: input.to_string(),
                reason: "target is empty".to_string(),
            });
        }
        if !allowed_target().is_match(trimmed) {
            return Err(ResolutionError::InvalidFormat {
                input: trimmed.to_string(),
                reason: "target contains characters not allowed in a host name or address".to_string(),
            });
        }

        let (host, port) = split_host_port(trimmed);
        if host.is_empty() {
            return Err(ResolutionError::InvalidFormat {
                input: trimmed.to_string(),
                reason: "target has no host part".to_string(),
            });
        }

        let (host, zone) = match host.split_once('%') {
            Some((addr, zone)) if !zone.is_empty() && addr.parse::<Ipv6Addr>().is_ok() => {
                (addr, Some(zone.to_string()))
            }
            _ => (host, None),
        };

        Ok(Self {
            raw: trimmed.to_string(),
            host: host.to_string(),
            port,
            zone,
        })
    }

    /// The trimmed input as given
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Host part (name or address literal, brackets removed)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Zone of a scoped IPv6 literal
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// The host as an address literal, if it is one; the zone is not part of it
    pub fn literal_address(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_host_port(target: &str) -> (&str, Option<u16>) {
    // [IPv6]:port or [IPv6]
    if let Some(rest) = target.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => match tail.strip_prefix(':') {
                Some(port) => match port.parse() {
                    Ok(port) => (host, Some(port)),
                    Err(_) => (target, None),
                },
                None if tail.is_empty() => (host, None),
                None => (target, None),
            },
            None => (target, None),
        };
    }

    // Bare IPv6 never carries a port
    if target.matches(':').count() > 1 {
        return (target, None);
    }

    if let Some((host, port)) = target.rsplit_once(':') {
        return match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (target, None),
        };
    }

    (target, None)
}

/// Address family of a resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

/// A concrete network address produced by resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub ip: IpAddr,
    pub family: AddressFamily,
    /// Port carried over from the target, used by connection-based probes
    pub port: Option<u16>,
    /// Interface index of a scoped IPv6 literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<u32>,
}

impl ResolvedAddress {
    pub fn new(ip: IpAddr, port: Option<u16>) -> Self {
        Self {
            ip,
            family: AddressFamily::of(&ip),
            port,
            scope_id: None,
        }
    }

    pub fn with_scope_id(mut self, scope_id: Option<u32>) -> Self {
        self.scope_id = scope_id;
        self
    }

    /// Address as passed to external tools: the IP with its `%scope` suffix
    pub fn host_string(&self) -> String {
        match (self.ip, self.scope_id) {
            (IpAddr::V6(ip), Some(scope)) => format!("{}%{}", ip, scope),
            (ip, _) => ip.to_string(),
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port) {
            (IpAddr::V6(_), Some(port)) => write!(f, "[{}]:{}", self.host_string(), port),
            (_, Some(port)) => write!(f, "{}:{}", self.host_string(), port),
            (_, None) => f.write_str(&self.host_string()),
        }
    }
}

/// Interface index for an IPv6 zone: numeric zones as given, interface
/// names looked up where the platform exposes them
pub fn interface_index(zone: &str) -> Option<u32> {
    if let Ok(index) = zone.parse::<u32>() {
        return Some(index);
    }

    #[cfg(target_os = "linux")]
    {
        if !zone.contains(['/', '.']) {
            let path = format!("/sys/class/net/{}/ifindex", zone);
            if let Ok(content) = std::fs::read_to_string(path) {
                return content.trim().parse().ok();
            }
        }
    }

    None
}

/// Why a target could not be turned into addresses
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionError {
    #[error("name '{name}' could not be resolved: {detail}")]
    NameNotFound { name: String, detail: String },

    #[error("resolution of '{name}' timed out after {timeout:?}")]
    ResolutionTimeout { name: String, timeout: Duration },

    #[error("invalid target '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },
}

/// Discriminant of [`ResolutionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionErrorKind {
    NameNotFound,
    ResolutionTimeout,
    InvalidFormat,
}

impl ResolutionError {
    pub fn kind(&self) -> ResolutionErrorKind {
        match self {
            Self::NameNotFound { .. } => ResolutionErrorKind::NameNotFound,
            Self::ResolutionTimeout { .. } => ResolutionErrorKind::ResolutionTimeout,
            Self::InvalidFormat { .. } => ResolutionErrorKind::InvalidFormat,
        }
    }
}

/// Result kind of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProbeResultKind {
    Success,
    Timeout,
    NetworkError,
    PermissionDenied,
}

impl ProbeResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::NetworkError => "network error",
            Self::PermissionDenied => "permission denied",
        }
    }
}

impl fmt::Display for ProbeResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transport reports for one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub kind: ProbeResultKind,
    pub latency: Option<Duration>,
    pub detail: Option<String>,
}

impl ProbeResult {
    pub fn success(latency: Duration) -> Self {
        Self {
            kind: ProbeResultKind::Success,
            latency: Some(latency),
            detail: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: ProbeResultKind::Timeout,
            latency: None,
            detail: None,
        }
    }

    pub fn network_error<S: Into<String>>(detail: S) -> Self {
        Self {
            kind: ProbeResultKind::NetworkError,
            latency: None,
            detail: Some(detail.into()),
        }
    }

    pub fn permission_denied<S: Into<String>>(detail: S) -> Self {
        Self {
            kind: ProbeResultKind::PermissionDenied,
            latency: None,
            detail: Some(detail.into()),
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Probing mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeMethod {
    /// ICMP echo through the system ping binary
    Icmp,
    /// TCP connect to the target port
    Tcp,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icmp => "ICMP",
            Self::Tcp => "TCP",
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProbeMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icmp" | "ping" => Ok(Self::Icmp),
            "tcp" => Ok(Self::Tcp),
            other => Err(AppError::parse(format!("Unknown probe method '{}', expected icmp or tcp", other))),
        }
    }
}

/// Name resolution mechanism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DnsConfig {
    /// Use system default DNS resolution
    System,
    /// Use custom DNS servers
    Custom { servers: Vec<IpAddr> },
    /// Use DNS-over-HTTPS with specified URL
    DoH { url: String },
}

impl DnsConfig {
    /// Get a human-readable name for this DNS configuration
    pub fn name(&self) -> String {
        match self {
            DnsConfig::System => "system resolver".to_string(),
            DnsConfig::Custom { servers } => {
                if servers.len() == 1 {
                    format!("custom DNS ({})", servers[0])
                } else {
                    format!("custom DNS ({} servers)", servers.len())
                }
            }
            DnsConfig::DoH { url } => match url::Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
                Some(host) => format!("DoH ({})", host),
                None => "DoH".to_string(),
            },
        }
    }
}
