//! ICMP echo probing through the system `ping` binary
//!
//! Raw ICMP sockets need elevated privileges on most systems; the setuid or
//! capability-enabled `ping` binary does not. One echo request is sent per
//! probe and the output is classified into a [`ProbeResult`].

use super::Transport;
use crate::types::{ProbeMethod, ProbeResult, ResolvedAddress};
use async_trait::async_trait;
use regex::Regex;
use std::{
    io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, Instant},
};
use tokio::process::Command;

/// Locations searched, in order, when `ping` is not on PATH
const PING_CANDIDATES: &[&str] = &["/bin/ping", "/usr/bin/ping", "/sbin/ping", "/usr/sbin/ping"];

/// Output fragments that mean the process may not send ICMP
const PERMISSION_MARKERS: &[&str] = &["operation not permitted", "permission denied", "cap_net_raw"];

/// Output fragments that mean the network reported the host as unreachable
const UNREACHABLE_MARKERS: &[&str] = &[
    "unreachable",
    "unknown host",
    "name or service not known",
    "could not find host",
    "general failure",
    "transmit failed",
];

/// Command-line dialect of the local ping binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingFlavor {
    /// iputils and busybox: `-W` in whole seconds
    Linux,
    /// macOS and FreeBSD: `-W` in milliseconds, exit 2 when nothing answers
    Bsd,
    Windows,
}

impl PingFlavor {
    fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "dragonfly")) {
            Self::Bsd
        } else {
            Self::Linux
        }
    }
}

fn latency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("latency pattern is valid")
    })
}

/// `N packets transmitted, M received` (Linux) or `M packets received` (BSD)
fn received_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+) packets transmitted, (\d+) (?:packets )?received").expect("received pattern is valid")
    })
}

fn received_count(stdout: &str) -> Option<u32> {
    received_pattern()
        .captures(stdout)
        .and_then(|c| c.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sends one ICMP echo per probe using the system ping utility
#[derive(Debug, Clone)]
pub struct SystemPingTransport {
    binary: Option<PathBuf>,
}

impl SystemPingTransport {
    /// Locate the ping binary on this system
    pub fn new() -> Self {
        Self { binary: find_ping_binary() }
    }

    /// Use an explicit binary; `None` behaves as if ping were not installed
    pub fn with_binary(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

impl Default for SystemPingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SystemPingTransport {
    async fn send_probe(&self, address: &ResolvedAddress, timeout: Duration) -> ProbeResult {
        let Some(binary) = &self.binary else {
            return ProbeResult::permission_denied("ping binary not found");
        };

        let start = Instant::now();
        let child = Command::new(binary)
            .args(ping_args(address, timeout, PingFlavor::current()))
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return classify_spawn_error(&e),
            Err(_) => return ProbeResult::timeout().with_detail(format!("no reply within {:?}", timeout)),
        };
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        classify_ping_output(output.status.code(), &stdout, &stderr, elapsed)
    }

    fn method(&self) -> ProbeMethod {
        ProbeMethod::Icmp
    }
}

fn find_ping_binary() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "ping.exe" } else { "ping" };

    if let Some(paths) = std::env::var_os("PATH") {
        if let Some(found) = std::env::split_paths(&paths).map(|dir| dir.join(exe)).find(|p| p.is_file()) {
            return Some(found);
        }
    }

    PING_CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Arguments for a single echo request with the given reply timeout
fn ping_args(address: &ResolvedAddress, timeout: Duration, flavor: PingFlavor) -> Vec<String> {
    let host = address.host_string();
    let millis = timeout.as_millis().max(1);
    match flavor {
        PingFlavor::Windows => vec!["-n".into(), "1".into(), "-w".into(), millis.to_string(), host],
        PingFlavor::Bsd => vec!["-c".into(), "1".into(), "-W".into(), millis.to_string(), host],
        PingFlavor::Linux => {
            // -W takes whole seconds; round up so the binary never gives up first
            let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
            vec!["-c".into(), "1".into(), "-W".into(), secs.max(1).to_string(), host]
        }
    }
}

fn classify_spawn_error(error: &io::Error) -> ProbeResult {
    match error.kind() {
        io::ErrorKind::NotFound => ProbeResult::permission_denied(format!("ping binary not found: {}", error)),
        io::ErrorKind::PermissionDenied => ProbeResult::permission_denied(format!("cannot execute ping: {}", error)),
        _ => ProbeResult::network_error(format!("failed to run ping: {}", error)),
    }
}

/// First non-empty line, used as the raw error detail
fn first_line(text: &str) -> Option<String> {
    text.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from)
}

/// Classify the result of one ping invocation
fn classify_ping_output(exit_code: Option<i32>, stdout: &str, stderr: &str, elapsed: Duration) -> ProbeResult {
    let combined = format!("{}\n{}", stdout, stderr).to_lowercase();
    let detail = first_line(stderr).or_else(|| first_line(stdout));

    if PERMISSION_MARKERS.iter().any(|m| combined.contains(m)) {
        return ProbeResult::permission_denied(detail.unwrap_or_else(|| "ICMP not permitted".to_string()));
    }

    let latency = latency_pattern()
        .captures(stdout)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|ms| Duration::from_secs_f64(ms / 1000.0));

    if exit_code == Some(0) {
        if let Some(latency) = latency {
            return ProbeResult::success(latency);
        }
    }

    // Windows reports "Destination host unreachable" replies with exit code 0
    if let Some(marker) = UNREACHABLE_MARKERS.iter().copied().find(|m| combined.contains(m)) {
        let line = combined
            .lines()
            .find(|l| l.contains(marker))
            .map(|l| l.trim().to_string())
            .or(detail);
        return ProbeResult::network_error(line.unwrap_or_else(|| marker.to_string()));
    }

    match exit_code {
        Some(0) => ProbeResult::success(elapsed),
        Some(1) => ProbeResult::timeout().with_detail("no reply"),
        // BSD ping exits 2 when no reply arrived
        Some(_) if stderr.trim().is_empty() && received_count(stdout) == Some(0) => {
            ProbeResult::timeout().with_detail("no reply")
        }
        Some(code) => ProbeResult::network_error(
            detail.unwrap_or_else(|| format!("ping exited with status {}", code)),
        ),
        None => ProbeResult::network_error("ping terminated by signal"),
    }
}
