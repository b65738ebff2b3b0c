use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ProbeConfig;
use crate::ping::HostResult;
use crate::ping_executor::IcmpTransport;
use crate::prober::{HostProber, RoundSettings};

type ResultStore = HashMap<String, Arc<Mutex<HostResult>>>;

/// State of the current batch. Its lock is only held for short updates so
/// readers never wait on a stop.
#[derive(Default)]
struct Batch {
    running: bool,
    cancel: Option<CancellationToken>,
    workers: Vec<JoinHandle<()>>,
    gate: Option<Arc<Semaphore>>,
    capacity: usize,
    grace: Duration,
}

/// Owns the per-host probers of a batch and the results they write.
///
/// Results outlive `stop` so history stays readable until `clear`.
pub struct ProbeManager {
    transport: Arc<dyn IcmpTransport>,
    /// Serializes start, stop and clear, including a stop's grace wait.
    lifecycle: Mutex<()>,
    batch: Mutex<Batch>,
    results: RwLock<ResultStore>,
}

impl ProbeManager {
    pub fn new(transport: Arc<dyn IcmpTransport>) -> Self {
        Self {
            transport,
            lifecycle: Mutex::new(()),
            batch: Mutex::new(Batch::default()),
            results: RwLock::new(HashMap::new()),
        }
    }

    /// Starts one prober per distinct host. Does nothing when a batch is
    /// already running or `hosts` is empty.
    ///
    /// Hosts are keyed by identifier, so a duplicate collapses into a single
    /// entry (the last occurrence wins).
    pub async fn start<I, S>(&self, hosts: I, config: &ProbeConfig)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _lifecycle = self.lifecycle.lock().await;
        let mut batch = self.batch.lock().await;
        if batch.running {
            debug!("batch already running, ignoring start");
            return;
        }

        let mut store: ResultStore = HashMap::new();
        for host in hosts {
            let host = host.into();
            let result = HostResult::new(host.clone(), config.max_store_logs);
            store.insert(host, Arc::new(Mutex::new(result)));
        }
        if store.is_empty() {
            debug!("no hosts given, nothing to start");
            return;
        }

        *self.results.write().await = store.clone();

        let capacity = config.max_concurrent_probes.clamp(1, Semaphore::MAX_PERMITS);
        let gate = Arc::new(Semaphore::new(capacity));
        let cancel = CancellationToken::new();
        let settings = RoundSettings::from(config);

        let host_count = store.len();
        batch.workers = store
            .into_iter()
            .map(|(host, result)| {
                let prober = HostProber::new(
                    host,
                    result,
                    self.transport.clone(),
                    gate.clone(),
                    cancel.clone(),
                    settings,
                );
                tokio::spawn(prober.run())
            })
            .collect();

        batch.running = true;
        batch.cancel = Some(cancel);
        batch.gate = Some(gate);
        batch.capacity = capacity;
        batch.grace = config.round_budget();

        info!(
            "started probing {} hosts ({} probes/round, at most {} in flight)",
            host_count, config.count, capacity
        );
    }

    /// Signals every prober and waits up to one round for them to exit.
    /// Probers still busy after that keep running detached until their
    /// in-flight probe returns.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        let (workers, grace) = {
            let mut batch = self.batch.lock().await;
            if !batch.running {
                debug!("no batch running, ignoring stop");
                return;
            }
            if let Some(cancel) = batch.cancel.take() {
                cancel.cancel();
            }
            (std::mem::take(&mut batch.workers), batch.grace)
        };
        let pending = workers.len();

        if tokio::time::timeout(grace, join_all(workers)).await.is_err() {
            warn!(
                "probers did not all exit within {:?}, leaving them to finish",
                grace
            );
        }

        let mut batch = self.batch.lock().await;
        batch.running = false;
        batch.gate = None;
        batch.capacity = 0;
        info!("stopped probing {} hosts", pending);
    }

    /// Drops all results. Ignored while a batch is running; callers stop first.
    pub async fn clear(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if self.batch.lock().await.running {
            debug!("batch running, ignoring clear");
            return;
        }
        self.results.write().await.clear();
        info!("cleared probe results");
    }

    /// Point-in-time copy of every host, sorted by host.
    pub async fn snapshot(&self) -> Vec<HostResult> {
        let results = self.results.read().await;
        let mut snapshot = Vec::with_capacity(results.len());
        for entry in results.values() {
            snapshot.push(entry.lock().await.clone());
        }
        snapshot.sort_by(|a, b| a.host.cmp(&b.host));
        snapshot
    }

    /// Copy of one host including its log, `None` if it is not part of the
    /// current results.
    pub async fn history(&self, host: &str) -> Option<HostResult> {
        let entry = self.results.read().await.get(host).cloned()?;
        let result = entry.lock().await.clone();
        Some(result)
    }

    pub async fn host_count(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_running(&self) -> bool {
        self.batch.lock().await.running
    }

    /// Probes currently holding an admission permit.
    pub async fn in_flight(&self) -> usize {
        let batch = self.batch.lock().await;
        batch
            .gate
            .as_ref()
            .map_or(0, |gate| batch.capacity - gate.available_permits())
    }
}

impl Drop for ProbeManager {
    fn drop(&mut self) {
        if let Some(cancel) = self.batch.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}
