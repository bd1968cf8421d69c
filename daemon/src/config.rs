use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use txbench_common::{
    config::{DEFAULT_NODE_PORT, VERSION},
    get_cli_styles,
    logger::LogConfig,
};

// Maximum number of peers connected at the same time
pub const DEFAULT_MAX_PEERS: usize = 32;

// Delay between two throughput reports, in seconds
pub const DEFAULT_REPORT_INTERVAL: u64 = 1;

fn default_bind_address() -> String {
    format!("0.0.0.0:{}", DEFAULT_NODE_PORT)
}

const fn default_max_peers() -> usize {
    DEFAULT_MAX_PEERS
}

const fn default_report_interval() -> u64 {
    DEFAULT_REPORT_INTERVAL
}

#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[clap(
    version = VERSION,
    about = "txbench_daemon - minimal node counting the transactions it receives"
)]
#[command(styles = get_cli_styles())]
pub struct Config {
    #[clap(flatten)]
    pub log: LogConfig,
    /// Address to listen on for incoming peers
    #[clap(long, default_value_t = default_bind_address())]
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of connected peers
    #[clap(long, default_value_t = default_max_peers())]
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,
    /// Verify the signatures of every received transaction
    ///
    /// Invalid transactions are still counted in the pool,
    /// but reported separately.
    #[clap(long)]
    #[serde(default)]
    pub verify_signatures: bool,
    /// Seconds between two throughput reports
    #[clap(long, default_value_t = default_report_interval())]
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

impl Config {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval.max(1))
    }
}

// Options of a running node, independent of the CLI
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub max_peers: usize,
    pub verify_signatures: bool,
    pub report_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_peers: DEFAULT_MAX_PEERS,
            verify_signatures: false,
            report_interval: Duration::from_secs(DEFAULT_REPORT_INTERVAL),
        }
    }
}

impl From<&Config> for NodeConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_peers: config.max_peers.max(1),
            verify_signatures: config.verify_signatures,
            report_interval: config.report_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["txbench_daemon"]);
        assert_eq!(config.bind_address, "0.0.0.0:20338");
        assert_eq!(config.max_peers, DEFAULT_MAX_PEERS);
        assert!(!config.verify_signatures);

        let node = NodeConfig::from(&config);
        assert_eq!(node.report_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = Config::parse_from([
            "txbench_daemon",
            "--max-peers",
            "0",
            "--report-interval",
            "0",
            "--verify-signatures",
        ]);
        let node = NodeConfig::from(&config);
        assert_eq!(node.max_peers, 1);
        assert_eq!(node.report_interval, Duration::from_secs(1));
        assert!(node.verify_signatures);
    }
}
