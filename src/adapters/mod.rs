//! Source adapters: one module per upstream proxy list, each exposing a single
//! `fetch` function with the same retry-then-give-up contract.

mod free_proxy_list;
mod gatherproxy;
mod github_lists;
mod proxy_list_download;
mod proxyscan;
mod proxyscrape;
mod pubproxy;
mod spys_one;
mod sslproxies;
mod us_proxy;

use std::future::Future;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::models::{Protocol, ProxyCandidate};

pub const ALL_SOURCES: &[&str] = &[
    "proxyscrape",
    "free-proxy-list",
    "sslproxies",
    "us-proxy",
    "pubproxy",
    "gatherproxy",
    "spys-one",
    "proxy-list-download",
    "proxyscan",
    "github-speedx",
    "github-shiftytr",
    "github-monosans",
    "github-jetkai",
];

#[derive(Debug, Clone)]
pub struct FetchParams {
    pub country: Option<String>,
    pub protocols: Vec<Protocol>,
    pub quantity: usize,
    pub timeout: Duration,
    pub retries: u32,
}

/// Dispatch by source id. Unknown ids yield an empty list rather than an error, so a
/// caller-supplied source list can never fail the whole scrape.
pub async fn fetch_source(
    client: &reqwest::Client,
    source: &str,
    params: &FetchParams,
) -> Vec<ProxyCandidate> {
    let candidates = match source {
        "proxyscrape" => proxyscrape::fetch(client, params).await,
        "free-proxy-list" => free_proxy_list::fetch(client, params).await,
        "sslproxies" => sslproxies::fetch(client, params).await,
        "us-proxy" => us_proxy::fetch(client, params).await,
        "pubproxy" => pubproxy::fetch(client, params).await,
        "gatherproxy" => gatherproxy::fetch(client, params).await,
        "spys-one" => spys_one::fetch(client, params).await,
        "proxy-list-download" => proxy_list_download::fetch(client, params).await,
        "proxyscan" => proxyscan::fetch(client, params).await,
        "github-speedx" => github_lists::fetch_speedx(client, params).await,
        "github-shiftytr" => github_lists::fetch_shiftytr(client, params).await,
        "github-monosans" => github_lists::fetch_monosans(client, params).await,
        "github-jetkai" => github_lists::fetch_jetkai(client, params).await,
        other => {
            log::warn!("unknown source adapter '{}'", other);
            Vec::new()
        }
    };
    candidates.into_iter().take(params.quantity).collect()
}

/// Retry a fallible fetch with exponential backoff (base 0.5s, factor 2^attempt),
/// giving up (and returning an empty list) once `retries` attempts are exhausted.
pub(crate) async fn retrying<F, Fut, T>(retries: u32, f: F) -> Vec<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(items) => return items,
            Err(e) => {
                if attempt >= retries {
                    log::warn!("adapter fetch exhausted retries: {}", e);
                    return Vec::new();
                }
                let backoff = Duration::from_millis(500 * (1u64 << attempt));
                log::debug!("adapter fetch failed ({}), retrying in {:?}", e, backoff);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Shared HTML-table parsing rule for the free-proxy-list family: column
/// `0=ip, 1=port, 3=country, 6=https_flag`.
pub(crate) fn parse_proxy_table(body: &str, source: &str) -> Vec<ProxyCandidate> {
    let document = Html::parse_document(body);
    let row_selector = Selector::parse("table#proxylisttable tbody tr")
        .or_else(|_| Selector::parse("table tbody tr"))
        .expect("static selector");
    let cell_selector = Selector::parse("td").expect("static selector");

    let mut out = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 7 {
            continue;
        }
        let ip = cells[0].clone();
        let port = match cells[1].parse::<u16>() {
            Ok(p) => p,
            Err(_) => continue,
        };
        let country = if cells[3].is_empty() { None } else { Some(cells[3].clone()) };
        let protocol = if cells[6].eq_ignore_ascii_case("yes") {
            Protocol::Https
        } else {
            Protocol::Http
        };
        out.push(ProxyCandidate {
            ip,
            port,
            protocol,
            country,
            source: source.to_string(),
        });
    }
    out
}
