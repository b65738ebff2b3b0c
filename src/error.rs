use thiserror::Error;

/// Failure of a single echo exchange. The prober records every variant as a
/// failed probe; none of them are fatal.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve host {0}")]
    Resolve(String),

    #[error("echo reply timed out")]
    Timeout,

    #[error("no ICMP client available for {0}")]
    Unsupported(&'static str),

    #[error("ICMP error: {0}")]
    Icmp(#[from] surge_ping::SurgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find config directory")]
    NoConfigDir,

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid network {0}")]
    InvalidNetwork(String),

    #[error("network {entry} has {size} addresses, limit is {limit}")]
    TooLarge {
        entry: String,
        size: u128,
        limit: u128,
    },
}
