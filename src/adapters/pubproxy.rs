//! pubproxy.com's JSON API, `https=true/false` maps directly to our protocol enum.

use serde::Deserialize;

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

#[derive(Debug, Deserialize)]
struct PubProxyResponse {
    data: Vec<PubProxyEntry>,
}

#[derive(Debug, Deserialize)]
struct PubProxyEntry {
    ip: String,
    port: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    https: Option<String>,
}

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    retrying(params.retries, || fetch_once(client, params)).await
}

async fn fetch_once(
    client: &reqwest::Client,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let mut url = "http://pubproxy.com/api/proxy?limit=20&format=json&type=http".to_string();
    if let Some(country) = &params.country {
        url.push_str(&format!("&country={}", country));
    }

    let resp: PubProxyResponse = client
        .get(&url)
        .timeout(params.timeout)
        .send()
        .await?
        .json()
        .await?;

    let candidates = resp
        .data
        .into_iter()
        .filter_map(|entry| {
            let port: u16 = entry.port.parse().ok()?;
            let protocol = match entry.https.as_deref() {
                Some("true") => Protocol::Https,
                _ => Protocol::Http,
            };
            Some(ProxyCandidate {
                ip: entry.ip,
                port,
                protocol,
                country: entry.country,
                source: "pubproxy".to_string(),
            })
        })
        .collect();
    Ok(candidates)
}
