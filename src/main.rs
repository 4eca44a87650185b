//! ovh-dynhost - DynHost updater for the OVH DNS API.

use clap::{Parser, Subcommand};
use ovh_dynhost::config::{Config, LogLevel};
use ovh_dynhost::detector::IpDetector;
use ovh_dynhost::providers::{dynhost_access_rules, OvhClient};
use ovh_dynhost::reconciler::Reconciler;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ovh-dynhost")]
#[command(about = "Keep OVH DynHost records in sync with the current public IP")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity (overrides `log_level` from the config file)
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a consumer key allowed to read and update DNS zones
    Auth {
        /// URL the browser is sent to once the key is validated
        #[arg(short, long)]
        redirection: Option<String>,
    },

    /// Update every configured DynHost record whose IP is stale
    Update {
        /// Use this address instead of asking the IP echo service
        #[arg(long)]
        ip: Option<Ipv4Addr>,
    },
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    let candidates = Config::candidate_paths();

    candidates
        .iter()
        .find(|candidate| candidate.exists())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::new(level.as_directive());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = get_config_path(cli.config);
    let config = Config::load_from(&config_path);

    let level = cli
        .log_level
        .or_else(|| config.as_ref().ok().and_then(|c| c.log_level))
        .unwrap_or(LogLevel::Info);
    init_logging(level);

    let config = config.map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    match cli.command {
        Commands::Auth { redirection } => cmd_auth(config, redirection).await?,
        Commands::Update { ip } => cmd_update(config, ip).await?,
    }

    Ok(())
}

async fn cmd_auth(config: Config, redirection: Option<String>) -> anyhow::Result<()> {
    let client = OvhClient::from_config(&config.ovh, config.timeout())?;
    let request = client
        .request_consumer_key(&dynhost_access_rules(), redirection.as_deref())
        .await?;

    println!("Visit the following URL to validate the consumer key:");
    println!("  {}", request.validation_url);
    println!();
    println!("Then add it to the [ovh] section of your config file:");
    println!("  consumer_key = \"{}\"", request.consumer_key);

    Ok(())
}

async fn cmd_update(config: Config, ip: Option<Ipv4Addr>) -> anyhow::Result<()> {
    // Checked before any network traffic.
    config.ovh.consumer_key().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    let client = OvhClient::from_config(&config.ovh, config.timeout())?;
    let detector = IpDetector::with_service(config.ip_service.clone(), config.timeout());

    let report = Reconciler::new(&client, &detector)
        .with_ip(ip)
        .run(&config.dynhosts)
        .await;

    if report.failed() > 0 {
        tracing::warn!(
            "{} of {} dynhost records could not be reconciled",
            report.failed(),
            report.targets.len()
        );
    }

    Ok(())
}
