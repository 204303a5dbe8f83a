//! Operations shared between the synchronous HTTP handlers and the job-backed
//! (scheduled or polled) code paths: scrape-then-persist, validate-then-persist.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::coordinator::ScrapeRequest;
use crate::models::{Anonymity, Protocol, ProxyRecord};
use crate::state::AppState;
use crate::validator::{validate_one, ValidatorConfig};

#[derive(Debug, Serialize)]
pub struct ScrapeOutcome {
    pub total_found: usize,
    pub proxies: Vec<ProxyRecord>,
    pub by_source: HashMap<String, u64>,
    pub execution_time_ms: u64,
}

pub async fn do_scrape(state: &AppState, request: ScrapeRequest) -> ScrapeOutcome {
    let started = Instant::now();
    let candidates = state.coordinator.scrape(request).await;

    let mut by_source: HashMap<String, u64> = HashMap::new();
    let mut proxies = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        *by_source.entry(candidate.source.clone()).or_insert(0) += 1;
        let record = state.catalog.upsert(
            &candidate.ip,
            candidate.port,
            candidate.protocol,
            candidate.country.clone(),
            Some(candidate.source.clone()),
        );
        proxies.push(record);
    }

    ScrapeOutcome {
        total_found: proxies.len(),
        proxies,
        by_source,
        execution_time_ms: started.elapsed().as_millis() as u64,
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateOutcome {
    pub total_tested: usize,
    pub valid_proxies: usize,
    pub invalid_proxies: usize,
    pub results: Vec<crate::models::ValidationResult>,
    pub execution_time_ms: u64,
}

pub async fn do_validate(
    state: &AppState,
    lines: &[String],
    config: ValidatorConfig,
) -> ValidateOutcome {
    let started = Instant::now();
    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(config.concurrent_tests.max(1)));
    let futures = lines.iter().map(|line| {
        let semaphore = semaphore.clone();
        let line = line.clone();
        let config = config.clone();
        async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            validate_one(&line, &config).await
        }
    });
    let results: Vec<_> = futures_util::future::join_all(futures).await;

    for result in &results {
        let (ip, port) = match result.proxy.rsplit_once(':') {
            Some((ip, port)) => match port.parse::<u16>() {
                Ok(port) => (ip.to_string(), port),
                Err(_) => continue,
            },
            None => continue,
        };
        let record = state.catalog.upsert(&ip, port, result.protocol, None, None);
        state.catalog.set_validation(
            &record.id,
            result.valid,
            result.anonymity,
            result.avg_response_time_ms,
        );
        if let Some(geo) = &result.geolocation {
            state.catalog.patch(&record.id, Some(geo.country.clone()), None);
        }
    }

    let valid_proxies = results.iter().filter(|r| r.valid).count();
    ValidateOutcome {
        total_tested: results.len(),
        valid_proxies,
        invalid_proxies: results.len() - valid_proxies,
        results,
        execution_time_ms: started.elapsed().as_millis() as u64,
    }
}

pub fn default_validator_config(state: &AppState) -> ValidatorConfig {
    ValidatorConfig {
        geo_provider: state.settings.geo_provider.clone(),
        anonymity_mode: state.settings.anonymity_detection_mode,
        timeout: Duration::from_secs(state.settings.scraper_timeout_sec),
        ..ValidatorConfig::default()
    }
}

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub duplicates: usize,
}

/// Every parseable line counts as `imported`, even if its identity already existed in
/// the catalog; `duplicates` only reflects lines that failed to parse. This mirrors the
/// external contract's field name even though it reads more like "skipped" — kept
/// verbatim because `POST /proxies/import` callers already depend on it.
pub fn do_import(state: &AppState, lines: &[String]) -> ImportOutcome {
    let mut imported = 0;
    let mut duplicates = 0;
    for line in lines {
        match crate::proxy_line::parse_proxy_line(line) {
            Some(parsed) => {
                state.catalog.upsert(&parsed.ip, parsed.port, parsed.protocol, None, None);
                imported += 1;
            }
            None => duplicates += 1,
        }
    }
    ImportOutcome { imported, duplicates }
}

pub fn parse_protocols(raw: &[String]) -> Vec<Protocol> {
    raw.iter().filter_map(|s| s.parse::<Protocol>().ok()).collect()
}

pub fn parse_anonymity(raw: &str) -> Option<Anonymity> {
    match raw.to_ascii_lowercase().as_str() {
        "transparent" => Some(Anonymity::Transparent),
        "anonymous" => Some(Anonymity::Anonymous),
        "elite" => Some(Anonymity::Elite),
        _ => None,
    }
}
