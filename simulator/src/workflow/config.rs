use crate::generator::structure::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// How the simulated service runs: where it listens and how jobs progress.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub bind: String,
    pub tick_ms: u64,
    /// Ticks a job waits in the queue before it starts running.
    pub queue_ticks: u32,
    /// Ticks a running job takes to finish.
    pub run_ticks: u32,
    /// Jobs whose sequences contain this marker fail instead of completing.
    pub fail_marker: String,
    pub generator: GeneratorConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
            tick_ms: 1_000,
            queue_ticks: 2,
            run_ticks: 5,
            fail_marker: "FAIL".into(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(bind: String, tick_ms: u64, seed: u64) -> Self {
        Self {
            bind,
            tick_ms,
            generator: GeneratorConfig {
                seed,
                ..GeneratorConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid bind address {}", self.bind))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_lifecycle_defaults() {
        let cfg = SimulatorConfig::from_args("0.0.0.0:9100".into(), 250, 7);
        assert_eq!(cfg.bind_addr().unwrap().port(), 9100);
        assert_eq!(cfg.tick(), Duration::from_millis(250));
        assert_eq!(cfg.generator.seed, 7);
        assert_eq!(cfg.fail_marker, "FAIL");
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"tick_ms: 100\nrun_ticks: 1\ngenerator:\n  seed: 42\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulatorConfig::load(&path).unwrap();
        assert_eq!(cfg.run_ticks, 1);
        assert_eq!(cfg.queue_ticks, 2);
        assert_eq!(cfg.generator.seed, 42);
        assert_eq!(cfg.bind, "127.0.0.1:8000");
    }

    #[test]
    fn bad_bind_address_is_reported() {
        let cfg = SimulatorConfig::from_args("localhost".into(), 10, 0);
        assert!(cfg.bind_addr().is_err());
    }
}
