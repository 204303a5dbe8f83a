//! Routes test traffic through a candidate proxy and classifies the result: overall
//! reachability, per-URL timing, anonymity level, and country of origin.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::config::settings::AnonymityMode;
use crate::models::{Anonymity, GeoResult, Protocol, UrlProbe, ValidationResult};
use crate::proxy_line::{parse_proxy_line, ParsedProxyLine};
use crate::utils::error::ProxyError;

const REFLECTION_ENDPOINT: &str = "https://httpbin.org/get";

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub test_urls: Vec<String>,
    pub timeout: Duration,
    pub test_all_urls: bool,
    pub check_anonymity: bool,
    pub check_geolocation: bool,
    pub concurrent_tests: usize,
    pub anonymity_mode: AnonymityMode,
    pub geo_provider: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            test_urls: vec!["https://httpbin.org/get".to_string()],
            timeout: Duration::from_secs(10),
            test_all_urls: false,
            check_anonymity: true,
            check_geolocation: false,
            concurrent_tests: 20,
            anonymity_mode: AnonymityMode::Basic,
            geo_provider: "ip-api".to_string(),
        }
    }
}

pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a batch of proxy lines concurrently, bounded by `concurrent_tests`.
    pub async fn validate_batch(&self, lines: &[String]) -> Vec<ValidationResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrent_tests.max(1)));
        let futures = lines.iter().map(|line| {
            let semaphore = semaphore.clone();
            let line = line.clone();
            let config = self.config.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                validate_one(&line, &config).await
            }
        });
        futures_util::future::join_all(futures).await
    }
}

/// Validate a single `protocol://[user:pass@]ip:port` (or bare `ip:port`) line.
pub async fn validate_one(line: &str, config: &ValidatorConfig) -> ValidationResult {
    let parsed = match parse_proxy_line(line) {
        Some(p) => p,
        None => {
            return ValidationResult {
                proxy: line.to_string(),
                valid: false,
                protocol: Protocol::Http,
                anonymity: None,
                avg_response_time_ms: None,
                test_results: HashMap::new(),
                geolocation: None,
                error: Some("invalid proxy format".to_string()),
            }
        }
    };

    let client = match build_client(&parsed, config.timeout) {
        Ok(c) => c,
        Err(e) => {
            return ValidationResult {
                proxy: line.to_string(),
                valid: false,
                protocol: parsed.protocol,
                anonymity: None,
                avg_response_time_ms: None,
                test_results: HashMap::new(),
                geolocation: None,
                error: Some(e.to_string()),
            }
        }
    };

    let probes = futures_util::future::join_all(
        config.test_urls.iter().map(|url| probe_url(&client, url)),
    )
    .await;

    let test_results: HashMap<String, UrlProbe> = config
        .test_urls
        .iter()
        .cloned()
        .zip(probes.into_iter())
        .collect();

    let any_success = test_results.values().any(|p| p.success);
    let all_success = !test_results.is_empty() && test_results.values().all(|p| p.success);
    let valid = if config.test_all_urls { all_success } else { any_success };

    let timed: Vec<u64> = test_results.values().filter_map(|p| p.response_time_ms).collect();
    let avg_response_time_ms = if timed.is_empty() {
        None
    } else {
        Some(timed.iter().sum::<u64>() / timed.len() as u64)
    };

    let anonymity = if config.check_anonymity && valid {
        detect_anonymity(&client, config.anonymity_mode).await
    } else {
        None
    };

    let geolocation = if config.check_geolocation && valid {
        detect_geolocation(&client, &parsed.ip, &config.geo_provider).await
    } else {
        None
    };

    ValidationResult {
        proxy: format!("{}:{}", parsed.ip, parsed.port),
        valid,
        protocol: parsed.protocol,
        anonymity,
        avg_response_time_ms,
        test_results,
        geolocation,
        error: None,
    }
}

fn build_client(parsed: &ParsedProxyLine, timeout: Duration) -> Result<reqwest::Client, ProxyError> {
    if matches!(parsed.protocol, Protocol::Socks4 | Protocol::Socks5) {
        // reqwest's `socks` feature negotiates the handshake; surfaced explicitly so a
        // build without it fails the single validation rather than silently bypassing
        // the proxy.
    }
    let proxy = reqwest::Proxy::all(parsed.proxy_url())
        .map_err(|_| ProxyError::TransportUnavailable(format!("{} transport unavailable", parsed.protocol)))?;
    reqwest::Client::builder()
        .proxy(proxy)
        .timeout(timeout)
        .build()
        .map_err(ProxyError::from)
}

async fn probe_url(client: &reqwest::Client, url: &str) -> UrlProbe {
    let start = Instant::now();
    match client.get(url).send().await {
        Ok(resp) => UrlProbe {
            success: resp.status().is_success(),
            status_code: Some(resp.status().as_u16()),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(_) => UrlProbe {
            success: false,
            status_code: None,
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
    }
}

async fn detect_anonymity(client: &reqwest::Client, mode: AnonymityMode) -> Option<Anonymity> {
    let resp = client.get(REFLECTION_ENDPOINT).send().await.ok()?;
    let headers = resp.headers().clone();
    Some(classify_anonymity(&headers, mode))
}

fn classify_anonymity(headers: &HeaderMap, mode: AnonymityMode) -> Anonymity {
    let has = |name: &str| headers.get(name).is_some();

    let transparent = has("x-forwarded-for")
        || (mode == AnonymityMode::Enhanced && (has("forwarded") || has("x-real-ip")));
    if transparent {
        return Anonymity::Transparent;
    }

    let anonymous = has("via") || (mode == AnonymityMode::Enhanced && has("proxy-connection"));
    if anonymous {
        return Anonymity::Anonymous;
    }

    Anonymity::Elite
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    country: Option<String>,
}

async fn detect_geolocation(client: &reqwest::Client, ip: &str, preferred: &str) -> Option<GeoResult> {
    let mut providers = vec![preferred.to_string(), "ipapi".to_string(), "ipinfo".to_string()];
    providers.dedup();

    for provider in providers {
        let result = match provider.as_str() {
            "ip-api" => query_ip_api(client, ip).await,
            "ipapi" => query_ipapi_co(client, ip).await,
            "ipinfo" => query_ipinfo(client, ip).await,
            _ => None,
        };
        if result.is_some() {
            return result;
        }
    }
    None
}

async fn query_ip_api(client: &reqwest::Client, ip: &str) -> Option<GeoResult> {
    let url = format!("http://ip-api.com/json/{}?fields=status,countryCode", ip);
    let resp: IpApiResponse = client.get(&url).send().await.ok()?.json().await.ok()?;
    if resp.status != "success" {
        return None;
    }
    resp.country_code.map(|country| GeoResult { country })
}

async fn query_ipapi_co(client: &reqwest::Client, ip: &str) -> Option<GeoResult> {
    let url = format!("https://ipapi.co/{}/json/", ip);
    let resp: IpApiCoResponse = client.get(&url).send().await.ok()?.json().await.ok()?;
    resp.country.map(|country| GeoResult { country })
}

async fn query_ipinfo(client: &reqwest::Client, ip: &str) -> Option<GeoResult> {
    #[derive(Deserialize)]
    struct IpInfoResponse {
        country: Option<String>,
    }
    let url = format!("https://ipinfo.io/{}/json", ip);
    let resp: IpInfoResponse = client.get(&url).send().await.ok()?.json().await.ok()?;
    resp.country.map(|country| GeoResult { country })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_basic_transparent_when_forwarded_for_present() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        assert_eq!(classify_anonymity(&headers, AnonymityMode::Basic), Anonymity::Transparent);
    }

    #[test]
    fn classify_basic_anonymous_when_only_via_present() {
        let mut headers = HeaderMap::new();
        headers.insert("via", "1.1 proxy".parse().unwrap());
        assert_eq!(classify_anonymity(&headers, AnonymityMode::Basic), Anonymity::Anonymous);
    }

    #[test]
    fn classify_elite_when_no_telltale_headers() {
        let headers = HeaderMap::new();
        assert_eq!(classify_anonymity(&headers, AnonymityMode::Basic), Anonymity::Elite);
    }

    #[test]
    fn classify_enhanced_catches_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "1.2.3.4".parse().unwrap());
        assert_eq!(classify_anonymity(&headers, AnonymityMode::Enhanced), Anonymity::Transparent);
    }
}
