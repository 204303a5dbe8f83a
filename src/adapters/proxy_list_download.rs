//! proxy-list.download's `/api/v1/get?type=<protocol>` endpoint, plain `ip:port` lines.

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    let protocols = if params.protocols.is_empty() {
        vec![Protocol::Http, Protocol::Https]
    } else {
        params.protocols.clone()
    };

    let mut out = Vec::new();
    for protocol in protocols {
        if !matches!(protocol, Protocol::Http | Protocol::Https) {
            continue;
        }
        let url = format!("https://www.proxy-list.download/api/v1/get?type={}", protocol.as_str());
        let items = retrying(params.retries, || fetch_once(client, &url, protocol, params)).await;
        out.extend(items);
    }
    out
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    protocol: Protocol,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let body = client.get(url).timeout(params.timeout).send().await?.text().await?;
    let candidates = body
        .lines()
        .filter_map(|line| {
            let (ip, port) = line.trim().split_once(':')?;
            let port: u16 = port.parse().ok()?;
            Some(ProxyCandidate {
                ip: ip.to_string(),
                port,
                protocol,
                country: None,
                source: "proxy-list-download".to_string(),
            })
        })
        .collect();
    Ok(candidates)
}
