use anyhow::Context;
use clap::Parser;
use log::info;
use service::routes::{routes, spawn_worker, SharedStore};
use service::store::JobStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SimulatorConfig;
use workflow::runner::Runner;

mod generator;
mod service;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Local stand-in for the Boltz prediction job service")]
struct Args {
    /// Load the simulator config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,
    /// Milliseconds between lifecycle ticks
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        SimulatorConfig::load(path)?
    } else {
        SimulatorConfig::from_args(args.bind, args.tick_ms, args.seed)
    };
    let addr = config.bind_addr()?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating simulator runtime")?;
    runtime.block_on(serve(config, addr))
}

async fn serve(config: SimulatorConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let store: SharedStore = Arc::new(RwLock::new(JobStore::new()));
    let worker = spawn_worker(store.clone(), Runner::new(&config), config.tick());

    let (bound, server) = warp::serve(routes(store))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = signal::ctrl_c().await;
        })
        .with_context(|| format!("binding job service to {addr}"))?;
    info!("job service listening on http://{}/api (Ctrl+C to stop)", bound);

    server.await;
    worker.abort();
    info!("job service stopped");
    Ok(())
}
