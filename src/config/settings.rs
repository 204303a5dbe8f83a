//! Environment-driven process configuration, loaded once at startup.
//!
//! Keys mirror the env vars of the distilled system this service replaces; `dotenvy`
//! lets operators keep them in a `.env` file during development.

use std::env;

use crate::utils::error::{ProxyError, ProxyResult};

#[derive(Debug, Clone)]
pub struct Settings {
    pub geo_provider: String,
    pub anonymity_detection_mode: AnonymityMode,
    pub scraper_timeout_sec: u64,
    pub scraper_max_retries: u32,
    pub scraper_cache_ttl_sec: u64,
    pub scraper_rate_limit_per_min: u32,
    pub scheduler_enabled: bool,
    pub scheduler_validate_every_minutes: u64,
    pub scheduler_scrape_every_minutes: u64,
    pub scheduler_validate_max_count: usize,
    pub scheduler_scrape_quantity: usize,
    pub api_host: String,
    pub api_port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymityMode {
    Basic,
    Enhanced,
}

impl Settings {
    /// Load from the process environment, applying a `.env` file if present.
    pub fn load() -> ProxyResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("no .env file loaded: {}", e);
        }

        let geo_provider = env_or("GEO_PROVIDER", "ip-api");
        let anonymity_detection_mode = match env_or("ANONYMITY_DETECTION_MODE", "basic").as_str() {
            "enhanced" => AnonymityMode::Enhanced,
            _ => AnonymityMode::Basic,
        };

        Ok(Self {
            geo_provider,
            anonymity_detection_mode,
            scraper_timeout_sec: env_parse("SCRAPER_TIMEOUT_SEC", 10)?,
            scraper_max_retries: env_parse("SCRAPER_MAX_RETRIES", 2)?,
            scraper_cache_ttl_sec: env_parse("SCRAPER_CACHE_TTL_SEC", 120)?,
            scraper_rate_limit_per_min: env_parse("SCRAPER_RATE_LIMIT_PER_MIN", 30)?,
            scheduler_enabled: env_parse("PROXY_SCHEDULER_ENABLED", false)?,
            scheduler_validate_every_minutes: env_parse(
                "PROXY_SCHEDULER_VALIDATE_EVERY_MINUTES",
                30,
            )?,
            scheduler_scrape_every_minutes: env_parse("PROXY_SCHEDULER_SCRAPE_EVERY_MINUTES", 60)?,
            scheduler_validate_max_count: env_parse("PROXY_SCHEDULER_VALIDATE_MAX_COUNT", 50)?,
            scheduler_scrape_quantity: env_parse("PROXY_SCHEDULER_SCRAPE_QUANTITY", 50)?,
            api_host: env_or("API_HOST", "127.0.0.1"),
            api_port: env_parse("API_PORT", 3000)?,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> ProxyResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ProxyError::Config(format!("invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
