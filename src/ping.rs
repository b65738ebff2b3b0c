use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::stats::standard_deviation;

/// One echo probe attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Local>,
    #[serde(rename = "AvgRtt", serialize_with = "nanos::serialize_option")]
    pub latency: Option<Duration>,
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Seq")]
    pub sequence: u64,
}

impl ProbeOutcome {
    pub fn success(timestamp: DateTime<Local>, latency: Duration, sequence: u64) -> Self {
        Self {
            timestamp,
            latency: Some(latency),
            success: true,
            sequence,
        }
    }

    pub fn failure(timestamp: DateTime<Local>, sequence: u64) -> Self {
        Self {
            timestamp,
            latency: None,
            success: false,
            sequence,
        }
    }
}

/// Rolling aggregate for one host.
///
/// Counters and min/max/avg cover every probe since the batch started.
/// The standard deviation only covers the retained `logs` window.
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    #[serde(rename = "Hostname")]
    pub host: String,
    #[serde(rename = "IPAddr")]
    pub address: Option<IpAddr>,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Local>,
    #[serde(rename = "TotalCount")]
    pub total: u64,
    #[serde(rename = "SuccessCount")]
    pub success: u64,
    #[serde(rename = "FailureCount")]
    pub failure: u64,
    #[serde(rename = "MinLatency", serialize_with = "nanos::serialize_option")]
    pub min_latency: Option<Duration>,
    #[serde(rename = "MaxLatency", serialize_with = "nanos::serialize_option")]
    pub max_latency: Option<Duration>,
    #[serde(rename = "AvgLatency", serialize_with = "nanos::serialize_option")]
    pub avg_latency: Option<Duration>,
    #[serde(rename = "StdDevLatency", serialize_with = "nanos::serialize")]
    pub std_dev: Duration,
    /// Percentage of probes that failed, 0 before the first probe.
    #[serde(rename = "LossRate")]
    pub loss_rate: f64,
    #[serde(rename = "LastPingFailed")]
    pub last_probe_failed: bool,
    #[serde(rename = "PingLogs")]
    pub logs: VecDeque<ProbeOutcome>,
    #[serde(skip)]
    latency_sum: Duration,
    #[serde(skip)]
    max_logs: usize,
}

impl HostResult {
    pub fn new(host: impl Into<String>, max_logs: usize) -> Self {
        Self {
            host: host.into(),
            address: None,
            start_time: Local::now(),
            total: 0,
            success: 0,
            failure: 0,
            min_latency: None,
            max_latency: None,
            avg_latency: None,
            std_dev: Duration::ZERO,
            loss_rate: 0.0,
            last_probe_failed: false,
            logs: VecDeque::with_capacity(max_logs),
            latency_sum: Duration::ZERO,
            max_logs,
        }
    }

    /// Folds one outcome into the counters and appends it to the log,
    /// evicting the oldest entries past the cap.
    pub fn record(&mut self, outcome: ProbeOutcome) {
        self.total += 1;

        match outcome.latency.filter(|_| outcome.success) {
            Some(rtt) => {
                self.success += 1;
                self.min_latency = Some(self.min_latency.map_or(rtt, |min| min.min(rtt)));
                self.max_latency = Some(self.max_latency.map_or(rtt, |max| max.max(rtt)));
                self.latency_sum += rtt;
                let mean = self.latency_sum.as_nanos() / u128::from(self.success);
                self.avg_latency = Some(Duration::from_nanos(mean as u64));
            }
            None => self.failure += 1,
        }
        self.last_probe_failed = !outcome.success;
        self.loss_rate = self.failure as f64 / self.total as f64 * 100.0;

        self.logs.push_back(outcome);
        while self.logs.len() > self.max_logs {
            self.logs.pop_front();
        }

        self.std_dev = standard_deviation(
            self.logs
                .iter()
                .filter(|o| o.success)
                .filter_map(|o| o.latency),
        );
    }
}

// Durations go over the wire as integer nanoseconds.
mod nanos {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn serialize_option<S>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_nanos() as u64).serialize(serializer)
    }
}
