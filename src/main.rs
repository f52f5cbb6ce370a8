use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crypto_wordle::{
    contract::default_entry_fee,
    deployment::DeploymentEnv,
    wallets,
};
use ethers::{
    types::Address,
    utils::parse_ether,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;

mod client;
mod ui;

const LOG_FILE: &str = "crypto-wordle.log";
const LOG_ENV: &str = "CRYPTO_WORDLE_LOG";
const DEFAULT_LOG_DIR: &str = ".logs";

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: crypto-wordle [--local | --sepolia | --practice] [--rpc-url <url>] [--chain-id <id>]\n\
         [--contract <address>] [--save-contract] [--wallet <name>] [--wallet-dir <path>]\n\
         [--entry-fee <eth>] [--auto-confirm] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --local              Play against a local node (default RPC {}, chain {})\n\
           --sepolia            Play on Sepolia (default RPC {}, chain {})\n\
           --practice           Play offline against an in-process table\n\
           --rpc-url <url>      Override the RPC URL for the selected network\n\
           --chain-id <id>      Override the chain id for the selected network\n\
           --contract <addr>    Game contract address (defaults to the latest recorded deployment)\n\
           --save-contract      Record --contract in .deployments/<network>/deployments.json\n\
           --wallet <name>      Keystore to play with\n\
           --wallet-dir <path>  Keystore directory (defaults to ~/.crypto-wordle/wallets)\n\
           --entry-fee <eth>    Fee paid by startGame (default 0.1)\n\
           --auto-confirm       Sign transactions without asking\n\
           --log-dir <path>     Where log files are written (default {})\n\
         \n\
         Logs are filtered with the {} environment variable (default info).",
        DeploymentEnv::Local.default_rpc_url(),
        DeploymentEnv::Local.default_chain_id(),
        DeploymentEnv::Sepolia.default_rpc_url(),
        DeploymentEnv::Sepolia.default_chain_id(),
        DEFAULT_LOG_DIR,
        LOG_ENV,
    );
    std::process::exit(0);
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<client::AppConfig> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Local,
        Sepolia,
        Practice,
    }

    fn set_network(slot: &mut Option<NetworkFlag>, flag: NetworkFlag) -> Result<()> {
        if slot.is_some() {
            return Err(eyre!(
                "Multiple network flags provided; choose one of --local/--sepolia/--practice"
            ));
        }
        *slot = Some(flag);
        Ok(())
    }

    fn once<T>(slot: &mut Option<T>, flag: &str, value: T) -> Result<()> {
        if slot.is_some() {
            return Err(eyre!("{flag} may only be specified once"));
        }
        *slot = Some(value);
        Ok(())
    }

    let mut args = args.into_iter();
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut chain_id: Option<u64> = None;
    let mut contract: Option<Address> = None;
    let mut save_contract = false;
    let mut wallet_name: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut entry_fee: Option<String> = None;
    let mut auto_confirm = false;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--local" => set_network(&mut network_flag, NetworkFlag::Local)?,
            "--sepolia" => set_network(&mut network_flag, NetworkFlag::Sepolia)?,
            "--practice" => set_network(&mut network_flag, NetworkFlag::Practice)?,
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--local/--sepolia)"
                    ));
                }
                once(&mut custom_url, "--rpc-url", url)?;
            }
            "--chain-id" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--chain-id requires a number"))?;
                let id = raw
                    .parse::<u64>()
                    .wrap_err_with(|| format!("Invalid chain id {raw:?}"))?;
                once(&mut chain_id, "--chain-id", id)?;
            }
            "--contract" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires an address"))?;
                let address = raw
                    .parse::<Address>()
                    .map_err(|e| eyre!("Invalid contract address {raw:?}: {e}"))?;
                once(&mut contract, "--contract", address)?;
            }
            "--save-contract" => save_contract = true,
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                once(&mut wallet_name, "--wallet", name)?;
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                once(&mut wallet_dir, "--wallet-dir", dir)?;
            }
            "--entry-fee" => {
                let fee = args
                    .next()
                    .ok_or_else(|| eyre!("--entry-fee requires an amount in ETH"))?;
                once(&mut entry_fee, "--entry-fee", fee)?;
            }
            "--auto-confirm" => auto_confirm = true,
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                once(&mut log_dir, "--log-dir", dir)?;
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let entry_fee = match entry_fee {
        Some(raw) => parse_ether(&raw)
            .map_err(|e| eyre!("Invalid entry fee {raw:?}: {e}"))?,
        None => default_entry_fee(),
    };
    if save_contract && contract.is_none() {
        return Err(eyre!("--save-contract requires --contract <address>"));
    }

    let env = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --local, --sepolia, or --practice"
            ));
        }
        Some(NetworkFlag::Practice) => {
            if custom_url.is_some() || contract.is_some() || wallet_name.is_some() {
                return Err(eyre!(
                    "--practice runs offline; drop --rpc-url, --contract and --wallet"
                ));
            }
            return Ok(client::AppConfig {
                backend: client::Backend::Practice,
                entry_fee,
                auto_confirm,
                log_dir: resolve_log_dir(log_dir),
            });
        }
        Some(NetworkFlag::Local) => DeploymentEnv::Local,
        Some(NetworkFlag::Sepolia) => DeploymentEnv::Sepolia,
    };

    let wallet = wallet_name
        .ok_or_else(|| eyre!("Specify --wallet <name> to select a keystore"))?;
    let wallet_dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;

    Ok(client::AppConfig {
        backend: client::Backend::Chain {
            network: client::NetworkTarget::new(env, custom_url, chain_id),
            contract,
            save_contract,
            wallet,
            wallet_dir,
        },
        entry_fee,
        auto_confirm,
        log_dir: resolve_log_dir(log_dir),
    })
}

fn resolve_log_dir(raw: Option<String>) -> PathBuf {
    match raw {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
        None => PathBuf::from(DEFAULT_LOG_DIR),
    }
}

fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args(std::env::args().skip(1))?;
    let _guard = init_tracing(&app_config.log_dir)?;
    tracing::info!("starting crypto-wordle client");
    client::run_app(app_config).await
}
