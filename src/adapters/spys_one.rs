//! spys.one's anonymous HTTP proxy list: no structured markup, just a loose
//! `IP:PORT` pattern scattered through the page body.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

const URL: &str = "http://spys.one/en/free-proxy-list/";

static IP_PORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<ip>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port>\d{2,5})").unwrap());

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    retrying(params.retries, || fetch_once(client, params)).await
}

async fn fetch_once(
    client: &reqwest::Client,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let body = client.get(URL).timeout(params.timeout).send().await?.text().await?;
    let candidates = IP_PORT_PATTERN
        .captures_iter(&body)
        .filter_map(|cap| {
            let ip = cap.name("ip")?.as_str().to_string();
            let port = cap.name("port")?.as_str().parse::<u16>().ok()?;
            Some(ProxyCandidate {
                ip,
                port,
                protocol: Protocol::Http,
                country: None,
                source: "spys-one".to_string(),
            })
        })
        .collect();
    Ok(candidates)
}
