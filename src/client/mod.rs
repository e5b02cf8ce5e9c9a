//! Probe transports
//!
//! A [`Transport`] sends one reachability probe and reports what happened.
//! Failures are returned as [`ProbeResult`] data, never as errors.

pub mod icmp;
pub mod tcp;

pub use icmp::SystemPingTransport;
pub use tcp::TcpConnectTransport;

use crate::types::{ProbeMethod, ProbeResult, ResolvedAddress};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Sends single probes to a resolved address
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one probe and wait at most `timeout` for its reply
    async fn send_probe(&self, address: &ResolvedAddress, timeout: Duration) -> ProbeResult;

    /// Mechanism used by this transport
    fn method(&self) -> ProbeMethod;
}

/// Build the transport for a probing method
pub fn transport_for(method: ProbeMethod, tcp_port: u16) -> Arc<dyn Transport> {
    match method {
        ProbeMethod::Icmp => Arc::new(SystemPingTransport::new()),
        ProbeMethod::Tcp => Arc::new(TcpConnectTransport::new(tcp_port)),
    }
}
