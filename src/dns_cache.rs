use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedAddress {
    address: IpAddr,
    resolved_at: Instant,
}

/// Resolved addresses per hostname, so a host probed every round is not
/// looked up again on every probe.
#[derive(Debug)]
pub struct DnsCache {
    entries: HashMap<String, CachedAddress>,
    ttl: Duration,
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Cached address for `hostname`, if it has not expired yet.
    pub fn get(&self, hostname: &str) -> Option<IpAddr> {
        self.entries
            .get(hostname)
            .filter(|entry| entry.resolved_at.elapsed() <= self.ttl)
            .map(|entry| entry.address)
    }

    pub fn insert(&mut self, hostname: impl Into<String>, address: IpAddr) {
        self.entries.insert(
            hostname.into(),
            CachedAddress {
                address,
                resolved_at: Instant::now(),
            },
        );
    }

    /// Forgets `hostname` so the next lookup goes to the resolver.
    pub fn remove(&mut self, hostname: &str) {
        self.entries.remove(hostname);
    }

    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.resolved_at.elapsed() <= ttl);
    }
}
