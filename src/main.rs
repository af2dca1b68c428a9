use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use transitbook::clock::SystemClock;
use transitbook::config::{default_config_path, ResolvedConfig};
use transitbook::credentials::{
    CredentialSource, Credentials, HttpCredentialSource, StaticCredentialSource,
};
use transitbook::fares;
use transitbook::format::{format_gbp, format_pounds};
use transitbook::storage::{JsonFileStorage, Storage};
use transitbook::sync::{DefaultProviderFactory, SupervisorStatus, SyncSupervisor};

#[derive(Parser)]
#[command(name = "transitbook")]
#[command(about = "Track London transit spend from your bank account")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync transit transactions and print the aggregates
    Sync {
        /// Use this access token instead of asking the credential server
        #[arg(long, env = "TRANSITBOOK_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Bank the token belongs to (monzo, starling)
        #[arg(long)]
        bank: Option<String>,
    },

    /// Show yearly travelcard prices for a zone pair
    Fares {
        #[arg(long)]
        from: Option<u8>,

        #[arg(long)]
        to: Option<u8>,
    },

    /// End the server session and delete synced transactions
    Logout,

    /// Show current configuration
    Config,
}

fn credential_source(
    config: &ResolvedConfig,
    token: Option<String>,
    bank: Option<String>,
) -> Arc<dyn CredentialSource> {
    match token {
        Some(token) => {
            let mut credentials = Credentials::new(SecretString::from(token));
            credentials.current_bank = bank;
            Arc::new(StaticCredentialSource::new(credentials))
        }
        None => Arc::new(HttpCredentialSource::new(&config.credentials.server_url)),
    }
}

fn supervisor(config: &ResolvedConfig, credentials: Arc<dyn CredentialSource>) -> SyncSupervisor {
    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
    SyncSupervisor::new(
        config.sync.clone(),
        credentials,
        Arc::new(DefaultProviderFactory::new(config)),
        storage,
        Arc::new(SystemClock),
    )
}

fn print_fare(from_zone: u8, to_zone: u8) {
    let yearly = fares::yearly_amount(from_zone, to_zone);
    println!("Zones {from_zone}-{to_zone}");
    println!("  Annual travelcard:       {}", format_gbp(yearly));
    println!(
        "  With Commuter Club loan: {}",
        format_gbp(fares::commuter_club(yearly))
    );
}

fn print_status(status: &SupervisorStatus, config: &ResolvedConfig) {
    let snapshot = &status.snapshot;

    println!("Yearly totals:");
    for (year, total) in &snapshot.year_totals {
        let average = snapshot.year_averages.get(year).copied().unwrap_or(0);
        println!(
            "  {year}: {} (avg {} / month)",
            format_pounds(*total),
            format_pounds(average)
        );
    }

    println!("\nMonthly totals:");
    for (month, total) in &snapshot.year_months {
        println!("  {month}: {}", format_pounds(*total));
    }

    println!("\nTotal spent:      {}", format_pounds(snapshot.full_total));
    println!("Window covered:   {}%", snapshot.percentage);
    println!("Monthly average:  {}", format_gbp(status.monthly_average));
    println!();
    print_fare(config.fares.from_zone, config.fares.to_zone);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load transitbook config: {}", cli.config.display()))?;

    match cli.command {
        Some(Command::Sync { token, bank }) => {
            let supervisor = supervisor(&config, credential_source(&config, token, bank));
            supervisor.start().await?;

            let status = supervisor.wait_until_settled().await?;
            supervisor.stop();

            if let Some(err) = &status.error {
                anyhow::bail!("Sync failed: {err}");
            }
            if !status.loading_complete {
                println!("Not authorised. Connect a bank through the credential server first.");
                return Ok(());
            }
            print_status(&status, &config);
        }
        Some(Command::Fares { from, to }) => {
            let from_zone = from.unwrap_or(config.fares.from_zone);
            let to_zone = to.unwrap_or(config.fares.to_zone);
            if fares::lookup(from_zone, to_zone).is_none() {
                anyhow::bail!(
                    "No fare for zones {from_zone}-{to_zone}; zones run {}-{}",
                    fares::MIN_ZONE,
                    fares::MAX_ZONE
                );
            }
            print_fare(from_zone, to_zone);
        }
        Some(Command::Logout) => {
            let credentials = credential_source(&config, None, None);
            supervisor(&config, credentials).logout().await?;
            println!("Logged out; synced transactions removed.");
        }
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
            println!(
                "Tick interval: {}ms",
                config.sync.tick_interval.as_millis()
            );
            println!("Lookback: {} months", config.sync.lookback_months);
            println!("Credential server: {}", config.credentials.server_url);
            println!("Monzo API: {}", config.providers.monzo_base_url);
            println!("Starling API: {}", config.providers.starling_base_url);
            println!("Merchant marker: {}", config.filter.merchant_marker);
            println!(
                "Default zones: {}-{}",
                config.fares.from_zone, config.fares.to_zone
            );
        }
        None => {
            println!("Transitbook - London transit spend tracker");
            println!("==========================================\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  sync      Sync transactions and show transit spend");
            println!("  fares     Show travelcard prices for a zone pair");
            println!("  logout    End the session and delete synced data");
            println!("  config    Show current configuration\n");
            println!("Run 'transitbook --help' for more options.");
        }
    }

    Ok(())
}
