use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use txbench_common::{config::VERSION, logger::init_logger, tokio::spawn_task};
use txbench_injector::{
    burst::burst,
    config::{
        BurstArgs, Command, Config, CreateWalletArgs, FileConfig, GenerateArgs, NodeArgs,
        RunArgs, WalletArgs,
    },
    generate::generate_transfer_file,
    sink::BroadcastSink,
    transport::{PeerNetwork, PeerTransport},
    Injector,
};
use txbench_wallet::{Account, Wallet};

const APP_NAME: &str = "txbench";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {path}");
                return Ok(());
            }

            FileConfig::generate_template(path)?;
            println!("Configuration template generated at {path}");
            println!("Edit the file and run the application with --config-file {path}");
            return Ok(());
        }
    }

    let (log, command) = match config.config_file.as_ref() {
        Some(path) => {
            let file = FileConfig::from_file(path)
                .with_context(|| format!("Failed to load config file '{path}'"))?;
            (file.log, file.command)
        }
        None => match config.command {
            Some(command) => (config.log, command),
            None => bail!("No command provided, see --help"),
        },
    };

    init_logger(&log, APP_NAME).context("Failed to initialize the logger")?;
    info!("txbench v{}", VERSION);

    match command {
        Command::Run(args) => run(args).await,
        Command::Generate(args) => generate(args).await,
        Command::Burst(args) => run_burst(args).await,
        Command::CreateWallet(args) => create_wallet(args),
    }
}

fn open_account(args: &WalletArgs) -> Result<Arc<Account>> {
    let wallet = Wallet::open(&args.wallet_path, &args.password)
        .with_context(|| format!("Failed to open wallet '{}'", args.wallet_path))?;
    let account = wallet.default_account()?;
    info!("Using account {} ({})", account.address(), account.label());
    Ok(account)
}

async fn connect(node: &NodeArgs) -> Result<Arc<PeerNetwork>> {
    let network = Arc::new(PeerNetwork::new(node.connect_timeout()));
    network
        .connect(&node.node_address, node.consensus)
        .await
        .with_context(|| format!("Failed to connect to {}", node.node_address))?;
    info!("{} peer(s) connected", network.connection_count());
    Ok(network)
}

async fn run(args: RunArgs) -> Result<()> {
    let run_config = args.to_run_config()?;
    let account = open_account(&args.wallet)?;
    let network = connect(&args.node).await?;

    let sink = Arc::new(BroadcastSink::new(network.clone(), run_config.consensus));
    let injector = Injector::new(run_config, account, sink)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        spawn_task("ctrl-c", async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping injection");
                cancel.cancel();
            }
        });
    }

    let result = injector.run(cancel).await;
    network.disconnect_all();

    match result {
        Ok(report) => {
            report.log_summary();
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let account = open_account(&args.wallet)?;
    generate_transfer_file(account.as_ref(), args.num, &args.output).await?;
    Ok(())
}

async fn run_burst(args: BurstArgs) -> Result<()> {
    let account = open_account(&args.wallet)?;
    let network = connect(&args.node).await?;
    burst(account.as_ref(), network.as_ref(), args.num, args.node.consensus).await?;
    network.disconnect_all();
    Ok(())
}

fn create_wallet(args: CreateWalletArgs) -> Result<()> {
    let wallet = Wallet::create(&args.wallet.wallet_path, &args.wallet.password, &args.label)
        .with_context(|| format!("Failed to create wallet '{}'", args.wallet.wallet_path))?;
    let account = wallet.default_account()?;
    println!("{}", account.address());
    Ok(())
}
