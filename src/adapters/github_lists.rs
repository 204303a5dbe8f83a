//! Community-maintained raw-text proxy lists on GitHub. Each maintainer publishes one
//! file per protocol; none carry country information.

use crate::models::{Protocol, ProxyCandidate};

use super::{retrying, FetchParams};

async fn fetch_raw_lines(
    client: &reqwest::Client,
    source: &'static str,
    urls_by_protocol: &[(Protocol, &str)],
    params: &FetchParams,
) -> Vec<ProxyCandidate> {
    let protocols: Vec<Protocol> = if params.protocols.is_empty() {
        urls_by_protocol.iter().map(|(p, _)| *p).collect()
    } else {
        params.protocols.clone()
    };

    let mut out = Vec::new();
    for (protocol, url) in urls_by_protocol.iter().filter(|(p, _)| protocols.contains(p)) {
        let protocol = *protocol;
        let url = *url;
        let items = retrying(params.retries, || fetch_once(client, url, protocol, source, params)).await;
        out.extend(items);
    }
    out
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    protocol: Protocol,
    source: &str,
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
                source: source.to_string(),
            })
        })
        .collect();
    Ok(candidates)
}

pub async fn fetch_speedx(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    const URLS: &[(Protocol, &str)] = &[
        (Protocol::Http, "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt"),
        (Protocol::Socks4, "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks4.txt"),
        (Protocol::Socks5, "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt"),
    ];
    fetch_raw_lines(client, "github-speedx", URLS, params).await
}

pub async fn fetch_shiftytr(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    const URLS: &[(Protocol, &str)] = &[
        (Protocol::Http, "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt"),
        (Protocol::Https, "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/https.txt"),
        (Protocol::Socks4, "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks4.txt"),
        (Protocol::Socks5, "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks5.txt"),
    ];
    fetch_raw_lines(client, "github-shiftytr", URLS, params).await
}

pub async fn fetch_monosans(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    const URLS: &[(Protocol, &str)] = &[
        (Protocol::Http, "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt"),
        (Protocol::Socks4, "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks4.txt"),
        (Protocol::Socks5, "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks5.txt"),
    ];
    fetch_raw_lines(client, "github-monosans", URLS, params).await
}

pub async fn fetch_jetkai(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    const URLS: &[(Protocol, &str)] = &[
        (Protocol::Http, "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-http.txt"),
        (Protocol::Socks4, "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-socks4.txt"),
        (Protocol::Socks5, "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-socks5.txt"),
    ];
    fetch_raw_lines(client, "github-jetkai", URLS, params).await
}
