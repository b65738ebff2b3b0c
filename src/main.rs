use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use pingx::api::{self, AppState};
use pingx::{ProbeConfig, ProbeManager, SurgeTransport, expand_hosts};

#[derive(Debug, Parser)]
#[command(name = "pingx", version, about = "Real-time batch ping monitor")]
struct Args {
    /// Address the HTTP API listens on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Config file, defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hosts or CIDR ranges to start probing right away
    #[arg(long, num_args = 1..)]
    hosts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => Some(path),
        None => ProbeConfig::default_path()
            .map_err(|e| error!("config will not be persisted: {e}"))
            .ok(),
    };
    let config = match &config_path {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };

    let transport = Arc::new(SurgeTransport::new()?);
    let manager = Arc::new(ProbeManager::new(transport));

    if !args.hosts.is_empty() {
        let hosts = expand_hosts(&args.hosts, &config)?;
        manager.start(hosts, &config).await;
    }

    let state = AppState::new(manager.clone(), config, config_path);
    let (addr, server) = warp::serve(api::routes(state))
        .try_bind_with_graceful_shutdown(args.listen, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })?;

    info!("listening on http://{addr}");
    server.await;

    manager.stop().await;
    Ok(())
}
