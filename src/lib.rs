//! Batch ICMP reachability monitor.
//!
//! [`ProbeManager`] runs one probing loop per host, bounded by a shared
//! admission gate, and keeps a rolling [`HostResult`] for each of them.

pub mod api;
pub mod config;
pub mod dns_cache;
pub mod error;
pub mod manager;
pub mod ping;
pub mod ping_executor;
pub mod prober;
pub mod stats;
pub mod targets;

pub use config::ProbeConfig;
pub use error::{ConfigError, TargetError, TransportError};
pub use manager::ProbeManager;
pub use ping::{HostResult, ProbeOutcome};
pub use ping_executor::{EchoReply, IcmpTransport, SurgeTransport};
pub use stats::standard_deviation;
pub use targets::expand_hosts;
