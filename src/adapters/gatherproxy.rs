//! gatherproxy.com embeds rows in inline JS as `gp.insertPrx({"PROXY_IP":"1.2.3.4",
//! "PROXY_PORT":"1F90", ...})`, with the port encoded as hex.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

const URL: &str = "http://www.gatherproxy.com/proxylist/anonymity/?t=Elite";

static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""PROXY_IP":"(?P<ip>[\d.]+)".*?"PROXY_PORT":"(?P<port>[0-9A-Fa-f]+)""#).unwrap()
});

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    retrying(params.retries, || fetch_once(client, params)).await
}

async fn fetch_once(
    client: &reqwest::Client,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let body = client.get(URL).timeout(params.timeout).send().await?.text().await?;
    let candidates = ROW_PATTERN
        .captures_iter(&body)
        .filter_map(|cap| {
            let ip = cap.name("ip")?.as_str().to_string();
            let port_raw = cap.name("port")?.as_str();
            let port = u16::from_str_radix(port_raw, 16)
                .ok()
                .or_else(|| port_raw.parse::<u16>().ok())?;
            Some(ProxyCandidate {
                ip,
                port,
                protocol: Protocol::Http,
                country: None,
                source: "gatherproxy".to_string(),
            })
        })
        .collect();
    Ok(candidates)
}
