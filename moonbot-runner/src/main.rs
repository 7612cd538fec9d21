mod accounts;
mod api;
mod cycle;
mod proxy;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use api::GrowthApi;
use cycle::{CycleController, Pacing};

#[derive(Debug, Parser)]
#[command(name = "moonbot", version)]
#[command(about = "Automated ticket redemption for the moon mini-game")]
struct Args {
    /// Line-delimited file of account credential query strings
    #[arg(long, default_value = "data.txt")]
    accounts: PathBuf,

    /// Proxy configuration file (JSON)
    #[arg(long, default_value = "config/config.json")]
    proxy_config: PathBuf,

    /// Route requests through the configured proxy
    #[arg(long)]
    proxy: bool,

    /// Base URL of the growth platform API
    #[arg(long, default_value = api::DEFAULT_BASE_URL)]
    base_url: String,

    /// Run a single pass over all accounts and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();

    let accounts = accounts::load_accounts(&args.accounts)?;
    ensure!(
        !accounts.is_empty(),
        "no accounts found in {}",
        args.accounts.display()
    );
    log::info!("loaded {} account(s)", accounts.len());

    let proxy = if args.proxy {
        let config = proxy::load_proxy_config(&args.proxy_config);
        if !config.use_proxy {
            log::warn!("proxy requested but the configuration disables it");
        }
        let proxy = config.to_proxy();
        if proxy.is_some() {
            log::info!("using proxy for connections");
        }
        proxy
    } else {
        log::info!("not using a proxy for connections");
        None
    };

    let api = GrowthApi::new(&args.base_url, proxy).context("building the API client")?;
    let controller = CycleController::new(api, Pacing::default());
    let mut rng = SmallRng::from_entropy();

    if args.once {
        controller.run_cycle(&accounts, &mut rng).await;
    } else {
        controller.run_forever(&accounts, &mut rng).await;
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "moonbot".bold().cyan());
    println!("{}", "ticket redemption automation".dimmed());
    println!();
}
