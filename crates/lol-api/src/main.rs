//! LoL API demo CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use lol_api::logging::{self, LogConfig};
use lol_api::{Config, Error, LolClient, MatchFilter, Region};
use reqwest::StatusCode;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Summoner name to look up
    summoner_name: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Riot API key (falls back to the RIOT_API_KEY environment variable)
    #[arg(short, long)]
    api_key: Option<String>,

    /// Regional shard (overrides the configured region)
    #[arg(short, long)]
    region: Option<Region>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    logging::init(LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "lol-api".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("LoL API client starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    // Resolve the API key
    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var("RIOT_API_KEY")
            .context("No API key given, pass --api-key or set RIOT_API_KEY")?,
    };

    // Initialize API client
    let region = args.region.unwrap_or(config.client.region);
    let client = LolClient::new(api_key, region, &config).context("Failed to create client")?;
    info!(region = %client.region(), "Client ready");

    // Look up the summoner
    let response = client.get_summoner_by_name(&args.summoner_name).await?;
    let summoner: Value =
        serde_json::from_str(&response.body).context("Summoner response was not valid JSON")?;
    let summoner_id = summoner["id"]
        .as_i64()
        .context("Summoner response had no id")?;
    let account_id = summoner["accountId"]
        .as_i64()
        .context("Summoner response had no accountId")?;
    info!(
        summoner_id,
        account_id,
        name = %args.summoner_name,
        "Summoner found"
    );

    // Check for a live game
    match client.get_current_match(summoner_id).await {
        Ok(current) => {
            info!(body_bytes = current.body.len(), "Summoner is in a game");
        }
        Err(Error::Upstream { status, .. }) if status == StatusCode::NOT_FOUND => {
            info!("Summoner is not in a game right now");
        }
        Err(e) => return Err(e.into()),
    }

    // Fetch recent matches, then the newest match in full
    let response = client
        .get_recent_matches(account_id, &MatchFilter::default())
        .await?;
    let matches: Value =
        serde_json::from_str(&response.body).context("Match list response was not valid JSON")?;
    match matches["matches"][0]["gameId"].as_i64() {
        Some(game_id) => {
            let detail = client.get_match(game_id).await?;
            info!(
                game_id,
                body_bytes = detail.body.len(),
                "Fetched newest match"
            );
        }
        None => warn!("No recent matches on record"),
    }

    // Display final statistics
    let stats = client.stats().await;
    info!("=== Session Complete ===");
    info!("Total calls: {}", stats.total_calls);
    info!("Errors: {}", stats.total_errors);
    info!("Rate limit overflows: {}", stats.total_overflows);
    info!("Calls in current second window: {}", stats.calls_in_second);
    info!("Calls in current minute window: {}", stats.calls_in_minute);

    Ok(())
}
