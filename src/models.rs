//! Shared data model: proxy records, candidates, jobs, validation results and webhooks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Socks4 => "socks4",
            Protocol::Socks5 => "socks5",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = crate::utils::error::ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "socks4" => Ok(Protocol::Socks4),
            "socks5" => Ok(Protocol::Socks5),
            other => Err(crate::utils::error::ProxyError::InvalidFormat(format!(
                "unknown protocol '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anonymity {
    Transparent,
    Anonymous,
    Elite,
}

/// Identity key a record is uniquely keyed by: (ip, port, protocol).
pub type ProxyKey = (String, u16, Protocol);

/// Durable row in the catalog store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub country: Option<String>,
    pub source: Option<String>,
    pub valid: bool,
    pub anonymity: Option<Anonymity>,
    pub last_checked: Option<DateTime<Utc>>,
    pub avg_response_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ProxyRecord {
    pub fn key(&self) -> ProxyKey {
        (self.ip.clone(), self.port, self.protocol)
    }
}

/// Transient candidate surfaced by a source adapter before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyCandidate {
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub country: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Scrape,
    Validate,
    /// Reserved for a foreign job kind produced outside this service; carried so a
    /// shared poller returns a uniform snapshot instead of an error on lookup.
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    /// Unestimated in v1 — always `None`; reserved so a future rate-based estimate can
    /// populate it without a wire-format change.
    pub eta_seconds: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlProbe {
    pub success: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub proxy: String,
    pub valid: bool,
    pub protocol: Protocol,
    pub anonymity: Option<Anonymity>,
    pub avg_response_time_ms: Option<u64>,
    pub test_results: HashMap<String, UrlProbe>,
    pub geolocation: Option<GeoResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoResult {
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub failures: u64,
}
