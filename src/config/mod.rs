use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub floorsheet: FloorsheetConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL pinged by the keep-alive task. Unset disables the task.
    #[serde(default)]
    pub keepalive_url: Option<String>,

    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_merolagani_url")]
    pub merolagani_url: String,

    #[serde(default = "default_sharesansar_url")]
    pub sharesansar_url: String,

    #[serde(default = "default_nepalipaisa_url")]
    pub nepalipaisa_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_company_timeout_secs")]
    pub company_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Floorsheet lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FloorsheetConfig {
    /// Prior calendar days replayed when the requested session has no trades.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_keepalive_interval_secs() -> u64 {
    280
}
fn default_merolagani_url() -> String {
    "https://merolagani.com".to_string()
}
fn default_sharesansar_url() -> String {
    "https://www.sharesansar.com".to_string()
}
fn default_nepalipaisa_url() -> String {
    "https://nepalipaisa.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_company_timeout_secs() -> u64 {
    15
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36".to_string()
}
fn default_lookback_days() -> u32 {
    7
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keepalive_url: None,
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            merolagani_url: default_merolagani_url(),
            sharesansar_url: default_sharesansar_url(),
            nepalipaisa_url: default_nepalipaisa_url(),
            timeout_secs: default_timeout_secs(),
            company_timeout_secs: default_company_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FloorsheetConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn company_timeout(&self) -> Duration {
        Duration::from_secs(self.company_timeout_secs)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("NEPSE").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration ({}), using defaults", e);
            AppConfig::default()
        });
        Ok(app_cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_fill_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 8080\n[floorsheet]\nlookback_days = 3\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.floorsheet.lookback_days, 3);
        assert_eq!(cfg.scraper.timeout_secs, 10);
        assert_eq!(cfg.scraper.company_timeout(), Duration::from_secs(15));
    }
}
