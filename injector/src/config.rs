use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use thiserror::Error;
use txbench_common::{
    config::{DEFAULT_NODE_PORT, VERSION},
    crypto::{Address, CryptoError},
    get_cli_styles,
    logger::LogConfig,
};
use txbench_wallet::config::DEFAULT_WALLET_PATH;

pub const DEFAULT_COUNT: u64 = 100_000;
pub const DEFAULT_TPS: u64 = 1000;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_PASSWORD: &str = "pwd";
pub const DEFAULT_OUTPUT_FILE: &str = "transfer.dat";
// Seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 3;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Destination address is required")]
    MissingDestination,
    #[error("Invalid destination address: {0}")]
    InvalidDestination(#[from] CryptoError),
    #[error("Error while reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

// Functions Helpers
fn default_count() -> u64 {
    DEFAULT_COUNT
}

fn default_tps() -> u64 {
    DEFAULT_TPS
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_node_address() -> String {
    format!("127.0.0.1:{}", DEFAULT_NODE_PORT)
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_wallet_path() -> String {
    DEFAULT_WALLET_PATH.to_owned()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_owned()
}

fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.to_owned()
}

fn default_num() -> u64 {
    1
}

fn default_label() -> String {
    "default".to_owned()
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct WalletArgs {
    /// Wallet file path
    #[clap(long = "wallet", default_value_t = default_wallet_path())]
    #[serde(default = "default_wallet_path")]
    pub wallet_path: String,
    /// Password of the wallet
    #[clap(long = "pwd", default_value_t = default_password())]
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for WalletArgs {
    fn default() -> Self {
        Self {
            wallet_path: default_wallet_path(),
            password: default_password(),
        }
    }
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct NodeArgs {
    /// Address of the node to inject transactions into
    #[clap(long = "node", default_value_t = default_node_address())]
    #[serde(default = "default_node_address")]
    pub node_address: String,
    /// Send transactions on the consensus lane
    #[clap(long)]
    #[serde(default)]
    pub consensus: bool,
    /// Timeout in seconds for the connection and the handshake
    #[clap(long, default_value_t = default_connect_timeout())]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for NodeArgs {
    fn default() -> Self {
        Self {
            node_address: default_node_address(),
            consensus: false,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl NodeArgs {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct RunArgs {
    /// Total number of transactions to send
    #[clap(short = 'r', long, default_value_t = default_count())]
    #[serde(default = "default_count")]
    pub count: u64,
    /// Transactions released per second
    #[clap(long, default_value_t = default_tps())]
    #[serde(default = "default_tps")]
    pub tps: u64,
    /// Number of concurrent senders
    #[clap(short = 'w', long, default_value_t = default_workers())]
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the queue between the throttler and the workers
    #[clap(long, default_value_t = default_queue_capacity())]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Destination address (hex)
    #[clap(long)]
    #[serde(default)]
    pub to: String,
    #[clap(flatten)]
    #[serde(default)]
    pub node: NodeArgs,
    #[clap(flatten)]
    #[serde(default)]
    pub wallet: WalletArgs,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            count: default_count(),
            tps: default_tps(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            to: String::new(),
            node: NodeArgs::default(),
            wallet: WalletArgs::default(),
        }
    }
}

impl RunArgs {
    pub fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        if self.to.is_empty() {
            return Err(ConfigError::MissingDestination);
        }

        let config = RunConfig {
            count: self.count,
            tps: self.tps,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            tick_interval: TICK_INTERVAL,
            destination: self.to.parse()?,
            consensus: self.node.consensus,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct GenerateArgs {
    /// Number of transactions to generate
    #[clap(short = 'n', long, default_value_t = default_num())]
    #[serde(default = "default_num")]
    pub num: u64,
    /// Output file
    #[clap(long, default_value_t = default_output_file())]
    #[serde(default = "default_output_file")]
    pub output: String,
    #[clap(flatten)]
    #[serde(default)]
    pub wallet: WalletArgs,
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct BurstArgs {
    /// Number of times the transaction is broadcasted
    #[clap(short = 'n', long, default_value_t = default_num())]
    #[serde(default = "default_num")]
    pub num: u64,
    #[clap(flatten)]
    #[serde(default)]
    pub node: NodeArgs,
    #[clap(flatten)]
    #[serde(default)]
    pub wallet: WalletArgs,
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct CreateWalletArgs {
    /// Label of the generated account
    #[clap(long, default_value_t = default_label())]
    #[serde(default = "default_label")]
    pub label: String,
    #[clap(flatten)]
    #[serde(default)]
    pub wallet: WalletArgs,
}

#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Inject transfers at a fixed rate into a node
    Run(RunArgs),
    /// Write signed transfers to a file instead of sending them
    Generate(GenerateArgs),
    /// Broadcast one signed transfer as fast as possible
    Burst(BurstArgs),
    /// Create a wallet with a new account
    CreateWallet(CreateWalletArgs),
}

// Content of a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub log: LogConfig,
    pub command: Command,
}

impl FileConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    // Template running the injector with default values
    pub fn generate_template(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let template = FileConfig {
            log: LogConfig::default(),
            command: Command::Run(RunArgs::default()),
        };
        fs::write(path, serde_json::to_string_pretty(&template)?)?;
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version = VERSION,
    about = "txbench - rate controlled transaction injector for node stress tests"
)]
#[command(styles = get_cli_styles())]
pub struct Config {
    #[clap(flatten)]
    pub log: LogConfig,
    /// JSON file to load the configuration from
    ///
    /// When set, it replaces every other flag.
    #[clap(long)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long, requires = "config_file")]
    pub generate_config_template: bool,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// Parameters of one injection run, fixed once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub count: u64,
    pub tps: u64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub tick_interval: Duration,
    pub destination: Address,
    pub consensus: bool,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::Zero("count"));
        }
        if self.tps == 0 {
            return Err(ConfigError::Zero("tps"));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero("workers"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue capacity"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Zero("tick interval"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txbench_common::crypto::ADDRESS_SIZE;

    #[test]
    fn test_cli_defaults() {
        let to = "11".repeat(ADDRESS_SIZE);
        let config = Config::parse_from(["txbench", "run", "--to", to.as_str()]);
        let Some(Command::Run(args)) = config.command else {
            panic!("expected the run command");
        };

        assert_eq!(args.count, DEFAULT_COUNT);
        assert_eq!(args.tps, DEFAULT_TPS);
        assert_eq!(args.workers, DEFAULT_WORKERS);
        assert_eq!(args.node.node_address, "127.0.0.1:20338");
        assert_eq!(args.wallet.wallet_path, "./wallet.dat");
        assert_eq!(args.wallet.password, "pwd");

        let run = args.to_run_config().unwrap();
        assert_eq!(run.destination, Address::new([0x11; ADDRESS_SIZE]));
        assert_eq!(run.tick_interval, TICK_INTERVAL);
    }

    #[test]
    fn test_short_flags() {
        let config = Config::parse_from([
            "txbench", "run", "-r", "50", "-w", "3", "--tps", "5", "--to", "00",
        ]);
        let Some(Command::Run(args)) = config.command else {
            panic!("expected the run command");
        };
        assert_eq!((args.count, args.workers, args.tps), (50, 3, 5));
        assert!(matches!(
            args.to_run_config(),
            Err(ConfigError::InvalidDestination(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut args = RunArgs {
            to: "22".repeat(ADDRESS_SIZE),
            ..Default::default()
        };
        assert!(args.to_run_config().is_ok());

        args.workers = 0;
        assert!(matches!(
            args.to_run_config(),
            Err(ConfigError::Zero("workers"))
        ));

        args.workers = 1;
        args.to.clear();
        assert!(matches!(
            args.to_run_config(),
            Err(ConfigError::MissingDestination)
        ));
    }

    #[test]
    fn test_template_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        FileConfig::generate_template(&path).unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        let Command::Run(args) = config.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.count, DEFAULT_COUNT);
        assert!(args.to.is_empty());
    }

    #[test]
    fn test_partial_file() {
        let config: FileConfig =
            serde_json::from_str(r#"{"command":{"generate":{"num":5}}}"#).unwrap();
        let Command::Generate(args) = config.command else {
            panic!("expected the generate command");
        };
        assert_eq!(args.num, 5);
        assert_eq!(args.output, DEFAULT_OUTPUT_FILE);
        assert_eq!(args.wallet.password, DEFAULT_PASSWORD);
    }
}
