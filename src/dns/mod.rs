//! Name resolution: turns a target into concrete addresses
//!
//! The [`Resolver`] owns the timeout and literal-address handling; the
//! actual lookup is delegated to a [`NameService`] (system resolver,
//! custom nameservers, or DNS-over-HTTPS).

use crate::{
    error::{AppError, Result},
    types::{interface_index, DnsConfig, ResolutionError, ResolvedAddress, Target},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use trust_dns_resolver::{
    config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    system_conf, TokioAsyncResolver,
};

/// Lookup mechanism behind the resolver
#[async_trait]
pub trait NameService: Send + Sync {
    /// Look up the addresses of a host name, in the order the mechanism returns them
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<IpAddr>, ResolutionError>;

    /// Human-readable description for logs and reports
    fn describe(&self) -> String;
}

/// Name service backed by trust-dns (system configuration or explicit nameservers)
pub struct TrustDnsNameService {
    resolver: TokioAsyncResolver,
    description: String,
    /// Per-query timeout the resolver was built with
    timeout: Duration,
}

impl TrustDnsNameService {
    /// Use the operating system's resolver configuration
    pub fn system() -> Result<Self> {
        let (config, opts) = system_conf::read_system_conf()
            .map_err(|e| AppError::network(format!("Failed to read system DNS config: {}", e)))?;

        Ok(Self {
            timeout: opts.timeout,
            resolver: TokioAsyncResolver::tokio(config, opts),
            description: DnsConfig::System.name(),
        })
    }

    /// Query the given nameservers over UDP with TCP fallback
    pub fn custom(servers: &[IpAddr]) -> Result<Self> {
        if servers.is_empty() {
            return Err(AppError::validation("No DNS servers provided"));
        }

        let mut config = ResolverConfig::new();
        for &server in servers {
            let socket_addr = SocketAddr::new(server, 53);
            config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
            config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Tcp));
        }

        let opts = ResolverOpts::default();
        Ok(Self {
            timeout: opts.timeout,
            resolver: TokioAsyncResolver::tokio(config, opts),
            description: DnsConfig::Custom { servers: servers.to_vec() }.name(),
        })
    }
}

#[async_trait]
impl NameService for TrustDnsNameService {
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<IpAddr>, ResolutionError> {
        let response = self
            .resolver
            .lookup_ip(name)
            .await
            .map_err(|e| map_resolve_error(name, &e, self.timeout))?;

        Ok(response.iter().collect())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

fn map_resolve_error(name: &str, error: &ResolveError, timeout: Duration) -> ResolutionError {
    match error.kind() {
        ResolveErrorKind::Timeout => ResolutionError::ResolutionTimeout {
            name: name.to_string(),
            timeout,
        },
        _ => ResolutionError::NameNotFound {
            name: name.to_string(),
            detail: error.to_string(),
        },
    }
}

/// DNS-over-HTTPS name service using the JSON API
#[derive(Clone)]
pub struct DoHNameService {
    url: String,
    client: Client,
}

/// DNS RCODE for a name that does not exist
const RCODE_NXDOMAIN: u64 = 3;

/// HTTP timeout of DoH queries
const DOH_TIMEOUT: Duration = Duration::from_secs(10);

impl DoHNameService {
    /// Create a DoH name service with its own HTTP client
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DOH_TIMEOUT)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self { url: url.into(), client }
    }

    async fn query_record(&self, name: &str, record_type: &str) -> std::result::Result<Vec<IpAddr>, ResolutionError> {
        let not_found = |detail: String| ResolutionError::NameNotFound {
            name: name.to_string(),
            detail,
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[("name", name), ("type", record_type)])
            .header("Accept", "application/dns-json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolutionError::ResolutionTimeout {
                        name: name.to_string(),
                        timeout: DOH_TIMEOUT,
                    }
                } else {
                    not_found(format!("DoH request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(not_found(format!("DoH query failed with status: {}", response.status())));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| not_found(format!("Failed to parse DoH response: {}", e)))?;

        if body.get("Status").and_then(|s| s.as_u64()) == Some(RCODE_NXDOMAIN) {
            return Err(not_found("NXDOMAIN".to_string()));
        }

        Ok(parse_answers(&body, record_type))
    }
}

/// Extract addresses of the requested record type from a DoH JSON answer
fn parse_answers(body: &serde_json::Value, record_type: &str) -> Vec<IpAddr> {
    let Some(answers) = body.get("Answer").and_then(|a| a.as_array()) else {
        return Vec::new();
    };

    answers
        .iter()
        .filter_map(|answer| answer.get("data").and_then(|d| d.as_str()))
        .filter_map(|data| match record_type {
            "A" => data.parse::<Ipv4Addr>().ok().map(IpAddr::V4),
            "AAAA" => data.parse::<Ipv6Addr>().ok().map(IpAddr::V6),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl NameService for DoHNameService {
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<IpAddr>, ResolutionError> {
        // A before AAAA keeps the order stable across providers
        let (v4, v6) = tokio::join!(self.query_record(name, "A"), self.query_record(name, "AAAA"));

        match (v4, v6) {
            (Ok(mut v4), Ok(v6)) => {
                v4.extend(v6);
                Ok(v4)
            }
            (Ok(ips), Err(_)) | (Err(_), Ok(ips)) => Ok(ips),
            (Err(e), Err(_)) => Err(e),
        }
    }

    fn describe(&self) -> String {
        DnsConfig::DoH { url: self.url.clone() }.name()
    }
}

/// Build the name service selected by the configuration
pub fn name_service_for(dns_config: &DnsConfig) -> Result<Arc<dyn NameService>> {
    Ok(match dns_config {
        DnsConfig::System => Arc::new(TrustDnsNameService::system()?),
        DnsConfig::Custom { servers } => Arc::new(TrustDnsNameService::custom(servers)?),
        DnsConfig::DoH { url } => Arc::new(DoHNameService::new(url.clone())?),
    })
}

/// Turns targets into resolved addresses
#[derive(Clone)]
pub struct Resolver {
    service: Arc<dyn NameService>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(service: Arc<dyn NameService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn describe(&self) -> String {
        self.service.describe()
    }

    /// Parse and resolve a raw target string
    pub async fn resolve_str(&self, input: &str) -> std::result::Result<Vec<ResolvedAddress>, ResolutionError> {
        let target = Target::parse(input)?;
        self.resolve(&target).await
    }

    /// Resolve a parsed target.
    ///
    /// Literal addresses are returned without any I/O. Names go through the
    /// name service under the resolve timeout; an empty answer is NameNotFound.
    pub async fn resolve(&self, target: &Target) -> std::result::Result<Vec<ResolvedAddress>, ResolutionError> {
        if let Some(ip) = target.literal_address() {
            let scope_id = match target.zone() {
                Some(zone) => Some(interface_index(zone).ok_or_else(|| ResolutionError::InvalidFormat {
                    input: target.raw().to_string(),
                    reason: format!("unknown interface '{}'", zone),
                })?),
                None => None,
            };
            return Ok(vec![ResolvedAddress::new(ip, target.port()).with_scope_id(scope_id)]);
        }

        let host = target.host();
        if host.contains([':', '[', ']', '%']) {
            return Err(ResolutionError::InvalidFormat {
                input: target.raw().to_string(),
                reason: "not a valid host name or address".to_string(),
            });
        }

        let ips = match tokio::time::timeout(self.timeout, self.service.lookup(host)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ResolutionError::ResolutionTimeout {
                    name: host.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if ips.is_empty() {
            return Err(ResolutionError::NameNotFound {
                name: host.to_string(),
                detail: "no addresses returned".to_string(),
            });
        }

        Ok(ips.into_iter().map(|ip| ResolvedAddress::new(ip, target.port())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolutionErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::{
        matchers::{method, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    /// Returns a fixed answer and counts lookups
    struct FixedNameService {
        answer: std::result::Result<Vec<IpAddr>, ResolutionError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedNameService {
        fn new(answer: std::result::Result<Vec<IpAddr>, ResolutionError>) -> Self {
            Self { answer, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl NameService for FixedNameService {
        async fn lookup(&self, _name: &str) -> std::result::Result<Vec<IpAddr>, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone()
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_literal_address_skips_lookup() {
        let service = Arc::new(FixedNameService::new(Ok(Vec::new())));
        let resolver = Resolver::new(service.clone(), Duration::from_secs(1));

        let addresses = resolver.resolve_str("198.51.100.1").await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].ip, "198.51.100.1".parse::<IpAddr>().unwrap());

        let addresses = resolver.resolve_str("[2001:db8::1]:8443").await.unwrap();
        assert_eq!(addresses[0].port, Some(8443));

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_error_reports_configured_timeout() {
        let timeout = Duration::from_secs(7);
        let error = ResolveError::from(ResolveErrorKind::Timeout);

        match map_resolve_error("example.com", &error, timeout) {
            ResolutionError::ResolutionTimeout { name, timeout: reported } => {
                assert_eq!(name, "example.com");
                assert_eq!(reported, timeout);
            }
            other => panic!("expected ResolutionTimeout, got {:?}", other),
        }

        let error = ResolveError::from(ResolveErrorKind::Message("no records"));
        assert_eq!(map_resolve_error("example.com", &error, timeout).kind(), ResolutionErrorKind::NameNotFound);
    }

    #[tokio::test]
    async fn test_custom_service_keeps_resolver_timeout() {
        let service = TrustDnsNameService::custom(&ips(&["127.0.0.1"])).unwrap();
        assert_eq!(service.timeout, ResolverOpts::default().timeout);
    }

    #[tokio::test]
    async fn test_scoped_ipv6_literal_keeps_zone() {
        let service = Arc::new(FixedNameService::new(Ok(Vec::new())));
        let resolver = Resolver::new(service.clone(), Duration::from_secs(1));

        let addresses = resolver.resolve_str("fe80::1%4").await.unwrap();
        assert_eq!(addresses[0].ip, "fe80::1".parse::<IpAddr>().unwrap());
        assert_eq!(addresses[0].scope_id, Some(4));

        #[cfg(target_os = "linux")]
        if std::path::Path::new("/sys/class/net/lo/ifindex").exists() {
            let addresses = resolver.resolve_str("fe80::1%lo").await.unwrap();
            assert!(addresses[0].scope_id.is_some());
        }

        let err = resolver.resolve_str("fe80::1%no-such-interface0").await.unwrap_err();
        assert_eq!(err.kind(), ResolutionErrorKind::InvalidFormat);
        let err = resolver.resolve_str("example.com%eth0").await.unwrap_err();
        assert_eq!(err.kind(), ResolutionErrorKind::InvalidFormat);

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_order_is_preserved() {
        let answer = ips(&["192.0.2.3", "2001:db8::7", "192.0.2.1"]);
        let service = Arc::new(FixedNameService::new(Ok(answer.clone())));
        let resolver = Resolver::new(service, Duration::from_secs(1));

        let addresses = resolver.resolve_str("example.com:22").await.unwrap();
        let resolved: Vec<IpAddr> = addresses.iter().map(|a| a.ip).collect();
        assert_eq!(resolved, answer);
        assert!(addresses.iter().all(|a| a.port == Some(22)));
    }

    #[tokio::test]
    async fn test_empty_answer_is_name_not_found() {
        let resolver = Resolver::new(Arc::new(FixedNameService::new(Ok(Vec::new()))), Duration::from_secs(1));
        let err = resolver.resolve_str("empty.example").await.unwrap_err();
        assert_eq!(err.kind(), ResolutionErrorKind::NameNotFound);
    }

    #[tokio::test]
    async fn test_name_service_error_passes_through() {
        let service = FixedNameService::new(Err(ResolutionError::NameNotFound {
            name: "nonexistent.invalid.test".to_string(),
            detail: "NXDOMAIN".to_string(),
        }));
        let resolver = Resolver::new(Arc::new(service), Duration::from_secs(1));

        let err = resolver.resolve_str("nonexistent.invalid.test").await.unwrap_err();
        assert_eq!(err.kind(), ResolutionErrorKind::NameNotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out() {
        let mut service = FixedNameService::new(Ok(ips(&["192.0.2.1"])));
        service.delay = Duration::from_secs(30);
        let resolver = Resolver::new(Arc::new(service), Duration::from_secs(5));

        let err = resolver.resolve_str("slow.example").await.unwrap_err();
        assert_eq!(
            err,
            ResolutionError::ResolutionTimeout {
                name: "slow.example".to_string(),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_targets_rejected_without_lookup() {
        let service = Arc::new(FixedNameService::new(Ok(ips(&["192.0.2.1"]))));
        let resolver = Resolver::new(service.clone(), Duration::from_secs(1));

        for input in ["", "bad host", "example.com:http"] {
            let err = resolver.resolve_str(input).await.unwrap_err();
            assert_eq!(err.kind(), ResolutionErrorKind::InvalidFormat, "input: {:?}", input);
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_answers_filters_by_type() {
        let body = serde_json::json!({
            "Status": 0,
            "Answer": [
                { "name": "example.com.", "type": 5, "data": "alias.example.com." },
                { "name": "alias.example.com.", "type": 1, "data": "93.184.216.34" },
                { "name": "alias.example.com.", "type": 28, "data": "2606:2800:220:1::1" }
            ]
        });

        assert_eq!(parse_answers(&body, "A"), ips(&["93.184.216.34"]));
        assert_eq!(parse_answers(&body, "AAAA"), ips(&["2606:2800:220:1::1"]));
        assert!(parse_answers(&serde_json::json!({ "Status": 0 }), "A").is_empty());
    }

    #[tokio::test]
    async fn test_doh_lookup_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Status": 0,
                "Answer": [{ "type": 1, "data": "192.0.2.10" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("type", "AAAA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Status": 0,
                "Answer": [{ "type": 28, "data": "2001:db8::10" }]
            })))
            .mount(&server)
            .await;

        let service = DoHNameService::new(format!("{}/dns-query", server.uri())).unwrap();
        let result = service.lookup("example.com").await.unwrap();
        assert_eq!(result, ips(&["192.0.2.10", "2001:db8::10"]));
    }

    #[tokio::test]
    async fn test_doh_nxdomain_is_name_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Status": 3 })))
            .mount(&server)
            .await;

        let service = DoHNameService::new(format!("{}/dns-query", server.uri())).unwrap();
        let err = service.lookup("nonexistent.invalid.test").await.unwrap_err();
        assert_eq!(err.kind(), ResolutionErrorKind::NameNotFound);
    }

    #[tokio::test]
    async fn test_doh_server_error_is_name_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = DoHNameService::new(server.uri()).unwrap();
        let err = service.lookup("example.com").await.unwrap_err();
        assert!(matches!(err, ResolutionError::NameNotFound { ref detail, .. } if detail.contains("503")));
    }

    #[tokio::test]
    async fn test_custom_service_requires_servers() {
        assert!(matches!(TrustDnsNameService::custom(&[]), Err(AppError::Validation(_))));

        let service = TrustDnsNameService::custom(&ips(&["192.0.2.53"])).unwrap();
        assert!(service.describe().contains("192.0.2.53"));
    }

    #[tokio::test]
    async fn test_name_service_for_doh() {
        let service = name_service_for(&DnsConfig::DoH {
            url: "https://dns.google/resolve".to_string(),
        })
        .unwrap();
        assert_eq!(service.describe(), "DoH (dns.google)");
    }
}
