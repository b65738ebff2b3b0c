use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::sync::Mutex;

use crate::dns_cache::DnsCache;
use crate::error::TransportError;

/// A completed echo exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoReply {
    pub address: IpAddr,
    pub rtt: Duration,
}

/// Performs a single echo request/reply exchange.
#[async_trait]
pub trait IcmpTransport: Send + Sync {
    async fn probe(
        &self,
        target: &str,
        timeout: Duration,
        size: usize,
        sequence: u16,
    ) -> Result<EchoReply, TransportError>;
}

/// Cuts a `:port` suffix and anything a resolver would choke on.
fn sanitize_hostname(hostname: &str) -> Option<String> {
    let (name, _) = hostname.split_once(':').unwrap_or((hostname, ""));
    let name: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        .collect();
    (!name.is_empty()).then_some(name)
}

/// ICMP transport backed by surge-ping raw sockets.
pub struct SurgeTransport {
    v4: Option<Client>,
    v6: Option<Client>,
    dns: Mutex<DnsCache>,
    identifier: AtomicU16,
}

impl SurgeTransport {
    /// Opens the ICMP sockets. Fails only when neither address family is
    /// available, usually for lack of raw-socket permission.
    pub fn new() -> Result<Self, TransportError> {
        let v4 = Client::new(&Config::default())
            .map_err(|e| warn!("ICMPv4 client unavailable: {e}"))
            .ok();
        let v6 = Client::new(&Config::builder().kind(ICMP::V6).build())
            .map_err(|e| warn!("ICMPv6 client unavailable: {e}"))
            .ok();

        if v4.is_none() && v6.is_none() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "could not open any ICMP socket",
            )));
        }

        Ok(Self {
            v4,
            v6,
            dns: Mutex::new(DnsCache::default()),
            identifier: AtomicU16::new(std::process::id() as u16),
        })
    }

    async fn resolve_target(&self, target: &str) -> Result<IpAddr, TransportError> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ip);
        }

        if let Some(ip) = self.dns.lock().await.get(target) {
            return Ok(ip);
        }

        let sanitized =
            sanitize_hostname(target).ok_or_else(|| TransportError::Resolve(target.to_string()))?;

        let ip = tokio::net::lookup_host(format!("{sanitized}:0"))
            .await
            .map_err(|_| TransportError::Resolve(target.to_string()))?
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| TransportError::Resolve(target.to_string()))?;

        let mut dns = self.dns.lock().await;
        dns.purge_expired();
        dns.insert(target, ip);
        Ok(ip)
    }

    fn client_for(&self, ip: IpAddr) -> Result<&Client, TransportError> {
        match ip {
            IpAddr::V4(_) => self.v4.as_ref().ok_or(TransportError::Unsupported("IPv4")),
            IpAddr::V6(_) => self.v6.as_ref().ok_or(TransportError::Unsupported("IPv6")),
        }
    }
}

#[async_trait]
impl IcmpTransport for SurgeTransport {
    async fn probe(
        &self,
        target: &str,
        timeout: Duration,
        size: usize,
        sequence: u16,
    ) -> Result<EchoReply, TransportError> {
        let address = self.resolve_target(target).await?;
        let client = self.client_for(address)?;

        let identifier = self.identifier.fetch_add(1, Ordering::Relaxed);
        let mut pinger = client.pinger(address, PingIdentifier(identifier)).await;
        pinger.timeout(timeout);

        let payload = vec![0u8; size];
        let error = match pinger.ping(PingSequence(sequence), &payload).await {
            Ok((_, rtt)) => return Ok(EchoReply { address, rtt }),
            Err(SurgeError::Timeout { .. }) => TransportError::Timeout,
            Err(e) => e.into(),
        };

        // a host that moved should be looked up again on the next probe
        if target.parse::<IpAddr>().is_err() {
            self.dns.lock().await.remove(target);
        }
        Err(error)
    }
}
