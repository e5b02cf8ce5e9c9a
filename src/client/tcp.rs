//! TCP connect probing

use super::Transport;
use crate::types::{ProbeMethod, ProbeResult, ResolvedAddress};
use async_trait::async_trait;
use std::{
    io,
    net::{IpAddr, SocketAddr, SocketAddrV6},
    time::{Duration, Instant},
};
use tokio::net::TcpStream;

/// Measures the time to complete a TCP handshake
#[derive(Debug, Clone)]
pub struct TcpConnectTransport {
    default_port: u16,
}

impl TcpConnectTransport {
    /// `default_port` is used when the resolved address carries no port
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }

    fn socket_addr(&self, address: &ResolvedAddress) -> SocketAddr {
        let port = address.port.unwrap_or(self.default_port);
        match address.ip {
            IpAddr::V6(ip) => SocketAddr::V6(SocketAddrV6::new(ip, port, 0, address.scope_id.unwrap_or(0))),
            ip => SocketAddr::new(ip, port),
        }
    }
}

#[async_trait]
impl Transport for TcpConnectTransport {
    async fn send_probe(&self, address: &ResolvedAddress, timeout: Duration) -> ProbeResult {
        let socket_addr = self.socket_addr(address);
        let start = Instant::now();

        match tokio::time::timeout(timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(_stream)) => ProbeResult::success(start.elapsed()),
            Ok(Err(e)) => classify_connect_error(&e),
            Err(_) => ProbeResult::timeout().with_detail(format!("no connection to {} within {:?}", socket_addr, timeout)),
        }
    }

    fn method(&self) -> ProbeMethod {
        ProbeMethod::Tcp
    }
}

/// Map a connect error to a probe result.
///
/// A refused connection proves the host answered, but the probe still did not
/// complete, so it counts as a network error.
fn classify_connect_error(error: &io::Error) -> ProbeResult {
    match error.kind() {
        io::ErrorKind::PermissionDenied => ProbeResult::permission_denied(error.to_string()),
        io::ErrorKind::TimedOut => ProbeResult::timeout().with_detail(error.to_string()),
        _ => ProbeResult::network_error(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeResultKind;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_listener_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpConnectTransport::new(port);
        let address = ResolvedAddress::new("127.0.0.1".parse().unwrap(), None);

        let result = transport.send_probe(&address, Duration::from_secs(2)).await;
        assert_eq!(result.kind, ProbeResultKind::Success);
        assert!(result.latency.is_some());
    }

    #[tokio::test]
    async fn test_address_port_overrides_default() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpConnectTransport::new(1);
        let address = ResolvedAddress::new("127.0.0.1".parse().unwrap(), Some(port));

        let result = transport.send_probe(&address, Duration::from_secs(2)).await;
        assert_eq!(result.kind, ProbeResultKind::Success);
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = TcpConnectTransport::new(port);
        let address = ResolvedAddress::new("127.0.0.1".parse().unwrap(), None);

        let result = transport.send_probe(&address, Duration::from_secs(2)).await;
        assert_eq!(result.kind, ProbeResultKind::NetworkError);
        assert!(result.latency.is_none());
        assert!(result.detail.is_some());
    }

    #[test]
    fn test_connect_error_classification() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify_connect_error(&denied).kind, ProbeResultKind::PermissionDenied);

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        assert_eq!(classify_connect_error(&timed_out).kind, ProbeResultKind::Timeout);

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(classify_connect_error(&reset).kind, ProbeResultKind::NetworkError);
    }

    #[test]
    fn test_socket_addr_for_ipv6() {
        let transport = TcpConnectTransport::new(443);
        let address = ResolvedAddress::new("2001:db8::1".parse().unwrap(), None);
        assert_eq!(transport.socket_addr(&address).to_string(), "[2001:db8::1]:443");
    }

    #[test]
    fn test_socket_addr_carries_scope_id() {
        let transport = TcpConnectTransport::new(22);
        let address = ResolvedAddress::new("fe80::1".parse().unwrap(), None).with_scope_id(Some(3));

        match transport.socket_addr(&address) {
            SocketAddr::V6(v6) => {
                assert_eq!(v6.scope_id(), 3);
                assert_eq!(v6.port(), 22);
            }
            other => panic!("expected IPv6 socket address, got {}", other),
        }
    }
}
