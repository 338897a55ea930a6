mod api;
mod config;
mod error;
mod models;
mod pipeline;
mod scraper;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::handlers::market_today;
use crate::api::types::Envelope;
use crate::api::AppState;
use crate::config::AppConfig;
use crate::pipeline::service::MarketService;
use crate::pipeline::snapshot::NEPSE_SNAPSHOT;
use crate::scraper::http_client::HttpClient;

/// Delay before the first keep-alive ping.
const KEEPALIVE_WARMUP: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "nepse-scraper", about = "NEPSE market data scraper and JSON API", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON API (default)
    Serve {
        /// Bind address (default: server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default: server.port from config)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Run one lookup and print its JSON envelope
    Scrape {
        #[arg(value_enum)]
        entity: Entity,

        /// Stock symbol, required for floorsheet and company
        #[arg(short, long)]
        symbol: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Entity {
    Gainers,
    LiveTrading,
    Indices,
    Floorsheet,
    Company,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "nepse_scraper=info,tower_http=info,warn",
        1 => "nepse_scraper=debug,tower_http=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let fetcher = Arc::new(HttpClient::new(&config.scraper)?);
    let service = MarketService::new(fetcher, config.clone(), NEPSE_SNAPSHOT);

    let command = cli.command.unwrap_or_else(|| Command::Serve {
        host: None,
        port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()),
    });

    match command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            if let Some(url) = config.server.keepalive_url.clone() {
                let every = Duration::from_secs(config.server.keepalive_interval_secs.max(1));
                tokio::spawn(keep_alive(url, every));
            }

            let app = api::build_router(AppState { service });
            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("Failed to bind {}:{}", host, port))?;
            info!("Listening on http://{}:{}", host, port);
            axum::serve(listener, app).await.context("Server error")?;
        }

        Command::Scrape { entity, symbol } => {
            let _t = utils::Timer::start(format!("{:?} lookup", entity));
            let json = match entity {
                Entity::Gainers => serde_json::to_string_pretty(&Envelope::from(service.gainers().await))?,
                Entity::LiveTrading => serde_json::to_string_pretty(&Envelope::from(service.live_trading().await))?,
                Entity::Indices => serde_json::to_string_pretty(&Envelope::from(service.indices().await))?,
                Entity::Floorsheet => {
                    let symbol = symbol.context("--symbol is required for floorsheet")?;
                    let report = service.floorsheet(&symbol, market_today()).await;
                    serde_json::to_string_pretty(&Envelope::success(report))?
                }
                Entity::Company => {
                    let symbol = symbol.context("--symbol is required for company")?;
                    let profile = service
                        .company(&symbol)
                        .await
                        .with_context(|| format!("No company data found for {}", symbol))?;
                    serde_json::to_string_pretty(&Envelope::success(profile))?
                }
            };
            println!("{}", json);
        }
    }

    Ok(())
}

/// Pings `<base_url>/health` forever so free-tier hosts keep the process up.
async fn keep_alive(base_url: String, every: Duration) {
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(30)).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Keep-alive disabled: {}", e);
            return;
        }
    };
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    info!("Keep-alive pinging {} every {:?}", url, every);

    tokio::time::sleep(KEEPALIVE_WARMUP).await;
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match client.get(&url).send().await {
            Ok(resp) => info!("Keep-alive {} -> {}", url, resp.status()),
            Err(e) => warn!("Keep-alive ping failed: {}", e),
        }
    }
}
