//! free-proxy-list.net: a single HTML table, columns `ip, port, code, country, anonymity,
//! https, last checked`.

use crate::models::ProxyCandidate;

use super::{parse_proxy_table, retrying, FetchParams};

const URL: &str = "https://free-proxy-list.net/";

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
    Ok(parse_proxy_table(&body, "free-proxy-list"))
}
