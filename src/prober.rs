use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::debug;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::config::ProbeConfig;
use crate::ping::{HostResult, ProbeOutcome};
use crate::ping_executor::IcmpTransport;

/// Per-round tuning, copied out of the config when a batch starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSettings {
    pub count: u32,
    pub interval: Duration,
    pub timeout: Duration,
    pub size: usize,
    pub wait: Duration,
}

impl From<&ProbeConfig> for RoundSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            count: config.count,
            interval: config.probe_interval(),
            timeout: config.probe_timeout(),
            size: config.size,
            wait: config.round_wait(),
        }
    }
}

/// Continuous probing loop for one host. It is the only writer of its
/// `HostResult`.
pub struct HostProber {
    host: String,
    result: Arc<Mutex<HostResult>>,
    transport: Arc<dyn IcmpTransport>,
    gate: Arc<Semaphore>,
    cancel: CancellationToken,
    settings: RoundSettings,
    sequence: u64,
}

impl HostProber {
    pub fn new(
        host: String,
        result: Arc<Mutex<HostResult>>,
        transport: Arc<dyn IcmpTransport>,
        gate: Arc<Semaphore>,
        cancel: CancellationToken,
        settings: RoundSettings,
    ) -> Self {
        Self {
            host,
            result,
            transport,
            gate,
            cancel,
            settings,
            sequence: 0,
        }
    }

    /// Runs rounds until the batch is cancelled.
    pub async fn run(mut self) {
        debug!("probing {} started", self.host);

        while !self.cancel.is_cancelled() {
            self.run_round().await;

            if self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.settings.wait) => {}
            }
        }

        debug!(
            "probing {} stopped after {} probes",
            self.host, self.sequence
        );
    }

    async fn run_round(&mut self) {
        for i in 0..self.settings.count {
            if i > 0 {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = sleep(self.settings.interval) => {}
                }
            }

            // Queue on the shared gate; a cancelled batch stops waiting.
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                permit = self.gate.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            let (outcome, address) = self.probe_once().await;
            drop(permit);

            self.record(outcome, address).await;
        }
    }

    async fn probe_once(&mut self) -> (ProbeOutcome, Option<IpAddr>) {
        let sequence = self.sequence;
        self.sequence += 1;
        let timestamp = Local::now();

        let exchange = self.transport.probe(
            &self.host,
            self.settings.timeout,
            self.settings.size,
            sequence as u16,
        );

        match timeout(self.settings.timeout, exchange).await {
            Ok(Ok(reply)) => (
                ProbeOutcome::success(timestamp, reply.rtt, sequence),
                Some(reply.address),
            ),
            Ok(Err(e)) => {
                debug!("probe {} #{} failed: {}", self.host, sequence, e);
                (ProbeOutcome::failure(timestamp, sequence), None)
            }
            Err(_) => {
                debug!("probe {} #{} timed out", self.host, sequence);
                (ProbeOutcome::failure(timestamp, sequence), None)
            }
        }
    }

    async fn record(&self, outcome: ProbeOutcome, address: Option<IpAddr>) {
        let mut result = self.result.lock().await;
        if result.address.is_none() {
            result.address = address;
        }
        result.record(outcome);
    }
}
