use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use tftpc::config::AppConfig;
use tftpc::tftp::client::{Client, ClientConfig, DEFAULT_PORT, DEFAULT_RETRIES, DEFAULT_TIMEOUT};

/// Fetch or push a file with a TFTP server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Server host name or IP address
    host: String,

    /// Transfer direction
    #[arg(value_enum)]
    operation: Operation,

    /// File name on the server
    filename: String,

    /// Server port [default: 69]
    #[arg(short, long)]
    port: Option<u16>,

    /// Seconds to wait for each response before retransmitting [default: 5]
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Attempts per exchange before giving up [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    retries: Option<u32>,

    /// Local file path (defaults to the base name of FILENAME)
    #[arg(short, long)]
    local: Option<PathBuf>,

    /// Config file (overrides $TFTPC_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Download FILENAME from the server
    Get,
    /// Upload FILENAME to the server
    Put,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let file_config = AppConfig::discover(cli.config.as_deref())?.client;

    let port = cli.port.or(file_config.port).unwrap_or(DEFAULT_PORT);
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .or(file_config.timeout)
        .unwrap_or(DEFAULT_TIMEOUT);
    let retries = cli.retries.or(file_config.retries).unwrap_or(DEFAULT_RETRIES);

    let server = resolve(&cli.host, port)?;
    let config = ClientConfig::new(server.ip(), server.port())
        .with_timeout(timeout)
        .with_retries(retries);
    let client = Client::new(config);
    log::debug!("Using {:?}", client.config());

    let local = match cli.local {
        Some(path) => path,
        None => default_local_path(cli.operation, &cli.filename)?,
    };

    match cli.operation {
        Operation::Get => client
            .get(&cli.filename, &local)
            .with_context(|| format!("get {} from {} failed", cli.filename, server))?,
        Operation::Put => client
            .put(&local, &cli.filename)
            .with_context(|| format!("put {} to {} failed", cli.filename, server))?,
    };

    Ok(())
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve host '{}'", host))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for host '{}'", host))
}

/// A download lands under the remote name's last component; an upload reads
/// FILENAME exactly as given
fn default_local_path(operation: Operation, remote: &str) -> Result<PathBuf> {
    match operation {
        Operation::Get => Path::new(remote)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a local file name from '{}'", remote)),
        Operation::Put => Ok(PathBuf::from(remote)),
    }
}
