#![allow(dead_code)]

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pingx::{EchoReply, HostResult, IcmpTransport, ProbeConfig, ProbeManager, TransportError};

/// In-memory transport: every probe "takes" `latency`, hosts in `failing`
/// never resolve. Tracks how many probes overlap.
pub struct ScriptedTransport {
    latency: Duration,
    failing: HashSet<String>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: HashSet::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }
}

#[async_trait]
impl IcmpTransport for ScriptedTransport {
    async fn probe(
        &self,
        target: &str,
        _timeout: Duration,
        _size: usize,
        _sequence: u16,
    ) -> Result<EchoReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(target) {
            return Err(TransportError::Resolve(target.to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(EchoReply {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            rtt: self.latency,
        })
    }
}

/// One quick round per host, then a wait long enough that tests see
/// exactly one round unless they shorten it.
pub fn fast_config() -> ProbeConfig {
    ProbeConfig {
        interval: 100,
        count: 4,
        timeout: 1,
        wait: 3600,
        ..ProbeConfig::default()
    }
}

/// Polls `host` until `done` holds, panicking after five seconds.
pub async fn wait_for<F>(manager: &ProbeManager, host: &str, mut done: F)
where
    F: FnMut(&HostResult) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(result) = manager.history(host).await {
            if done(&result) {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting on {host}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
