use anyhow::Context;
use boltzcore::ClientConfig;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Boltz structure-prediction dashboard")]
pub struct Args {
    /// Load client settings from YAML
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Base URL of the job service API
    #[arg(long)]
    pub api_base: Option<String>,
    /// Milliseconds between job list polls
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<ClientConfig> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading client config {}", path_ref.display()))?;
    let config: ClientConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing client config {}", path_ref.display()))?;
    Ok(config)
}

/// File settings first, then command-line overrides.
pub fn resolve(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(api_base) = &args.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    Ok(config)
}
