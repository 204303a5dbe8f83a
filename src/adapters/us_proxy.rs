//! us-proxy.org: same HTML table shape, naturally biased towards US-located proxies.

use crate::models::ProxyCandidate;

use super::{parse_proxy_table, retrying, FetchParams};

const URL: &str = "https://www.us-proxy.org/";

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
    let body = client.get(URL).timeout(params.timeout).send().await?.text().await?;
    Ok(parse_proxy_table(&body, "us-proxy"))
}
