//! proxyscan.io's JSON list; `Type` is sometimes a bare string and sometimes an array
//! of strings depending on how many protocols the upstream observed for a proxy.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

const URL: &str = "https://www.proxyscan.io/api/proxy?format=json&limit=100";

#[derive(Debug, Deserialize)]
struct ProxyScanEntry {
    #[serde(rename = "Ip")]
    ip: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Type")]
    proxy_type: Value,
    #[serde(rename = "Location")]
    location: Option<ProxyScanLocation>,
}

#[derive(Debug, Deserialize)]
struct ProxyScanLocation {
    #[serde(rename = "Country")]
    country: Option<String>,
}

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    let rows = retrying(params.retries, || fetch_once(client, params)).await;
    match &params.country {
        Some(country) => rows
            .into_iter()
            .filter(|c| c.country.as_deref() == Some(country.as_str()))
            .collect(),
        None => rows,
    }
}

async fn fetch_once(
    client: &reqwest::Client,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let entries: Vec<ProxyScanEntry> = client
        .get(URL)
        .timeout(params.timeout)
        .send()
        .await?
        .json()
        .await?;

    let mut out = Vec::new();
    for entry in entries {
        let country = entry.location.and_then(|l| l.country);
        for protocol in proxy_types(&entry.proxy_type) {
            out.push(ProxyCandidate {
                ip: entry.ip.clone(),
                port: entry.port,
                protocol,
                country: country.clone(),
                source: "proxyscan".to_string(),
            });
        }
    }
    Ok(out)
}

fn proxy_types(value: &Value) -> Vec<Protocol> {
    let raw: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    raw.iter()
        .filter_map(|s| s.to_ascii_lowercase().parse::<Protocol>().ok())
        .collect()
}
