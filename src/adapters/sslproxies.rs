//! sslproxies.org: same HTML table shape as free-proxy-list, HTTPS-only upstream so
//! every row is forced to the https protocol regardless of the flag column.

use crate::models::{Protocol, ProxyCandidate};

use super::{parse_proxy_table, retrying, FetchParams};

const URL: &str = "https://www.sslproxies.org/";

pub async fn fetch(client: &reqwest::Client, params: &FetchParams) -> Vec<ProxyCandidate> {
    let rows = retrying(params.retries, || fetch_once(client, params)).await;
    rows.into_iter()
        .map(|mut c| {
            c.protocol = Protocol::Https;
            c.source = "sslproxies".to_string();
            c
        })
        .filter(|c| match &params.country {
            Some(country) => c.country.as_deref() == Some(country.as_str()),
            None => true,
        })
        .collect()
}

async fn fetch_once(
    client: &reqwest::Client,
    params: &FetchParams,
) -> Result<Vec<ProxyCandidate>, reqwest::Error> {
    let body = client.get(URL).timeout(params.timeout).send().await?.text().await?;
    Ok(parse_proxy_table(&body, "sslproxies"))
}
