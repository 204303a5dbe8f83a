//! Fans a scrape request out to the selected source adapters in parallel, applying a
//! short-TTL cache and a per-source sliding-minute rate limit in front of each one.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::adapters::{self, FetchParams};
use crate::models::{Protocol, ProxyCandidate};

const CACHE_CAPACITY: usize = 256;
const MAX_ITEMS_PER_KEY: usize = 1000;

pub struct ScrapeRequest {
    pub country: Option<String>,
    pub protocols: Vec<Protocol>,
    pub sources: Vec<String>,
    pub quantity: usize,
    pub timeout: Duration,
    pub retries: u32,
}

struct CacheEntry {
    inserted_at: Instant,
    items: Vec<ProxyCandidate>,
}

struct RateState {
    minute: i64,
    count: u32,
}

pub struct ScrapingCoordinator {
    client: reqwest::Client,
    cache: Mutex<LruCache<String, CacheEntry>>,
    cache_ttl: Duration,
    rate_limit_per_min: u32,
    rate_state: Mutex<std::collections::HashMap<String, RateState>>,
}

impl ScrapingCoordinator {
    pub fn new(client: reqwest::Client, cache_ttl: Duration, rate_limit_per_min: u32) -> Self {
        Self {
            client,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())),
            cache_ttl,
            rate_limit_per_min,
            rate_state: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn cache_key(source: &str, country: &Option<String>, protocols: &[Protocol]) -> String {
        let mut sorted: Vec<&str> = protocols.iter().map(|p| p.as_str()).collect();
        sorted.sort_unstable();
        format!(
            "{}|{}|{}",
            source,
            country.as_deref().unwrap_or(""),
            sorted.join(",")
        )
    }

    fn cached(&self, key: &str) -> Option<Vec<ProxyCandidate>> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.cache_ttl {
                return Some(entry.items.clone());
            }
        }
        None
    }

    fn store_cache(&self, key: String, mut items: Vec<ProxyCandidate>) {
        items.truncate(MAX_ITEMS_PER_KEY);
        self.cache.lock().put(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                items,
            },
        );
    }

    /// Returns true if this call is allowed to proceed against the source this minute.
    fn check_rate_limit(&self, source: &str) -> bool {
        let minute = chrono::Utc::now().timestamp() / 60;
        let mut state = self.rate_state.lock();
        let entry = state.entry(source.to_string()).or_insert(RateState { minute, count: 0 });
        if entry.minute != minute {
            entry.minute = minute;
            entry.count = 0;
        }
        if entry.count >= self.rate_limit_per_min {
            return false;
        }
        entry.count += 1;
        true
    }

    pub async fn scrape(&self, request: ScrapeRequest) -> Vec<ProxyCandidate> {
        let sources: Vec<String> = if request.sources.is_empty() {
            adapters::ALL_SOURCES.iter().map(|s| s.to_string()).collect()
        } else {
            request.sources.clone()
        };

        let fetch_params = FetchParams {
            country: request.country.clone(),
            protocols: request.protocols.clone(),
            quantity: request.quantity,
            timeout: request.timeout,
            retries: request.retries,
        };

        let mut to_fetch = Vec::new();
        let mut collected: Vec<ProxyCandidate> = Vec::new();

        for source in &sources {
            let key = Self::cache_key(source, &request.country, &request.protocols);
            if let Some(items) = self.cached(&key) {
                collected.extend(items);
                continue;
            }
            if !self.check_rate_limit(source) {
                log::debug!("source '{}' over rate limit this minute, skipping", source);
                continue;
            }
            to_fetch.push((source.clone(), key));
        }

        let fetches = to_fetch.iter().map(|(source, _)| {
            let client = self.client.clone();
            let params = fetch_params.clone();
            let source = source.clone();
            async move { (source.clone(), adapters::fetch_source(&client, &source, &params).await) }
        });

        let results = futures_util::future::join_all(fetches).await;
        for ((_, key), (source, items)) in to_fetch.iter().zip(results.into_iter()) {
            self.store_cache(key.clone(), items.clone());
            log::info!("source '{}' returned {} candidates", source, items.len());
            collected.extend(items);
        }

        dedup(collected, request.quantity)
    }
}

fn dedup(items: Vec<ProxyCandidate>, quantity: usize) -> Vec<ProxyCandidate> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = (item.ip.clone(), item.port, item.protocol);
        if seen.insert(key) {
            out.push(item);
            if out.len() >= quantity {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ip: &str, port: u16) -> ProxyCandidate {
        ProxyCandidate {
            ip: ip.to_string(),
            port,
            protocol: Protocol::Http,
            country: None,
            source: "test".to_string(),
        }
    }

    #[test]
    fn dedup_preserves_first_occurrence_order_and_truncates() {
        let items = vec![candidate("1.1.1.1", 80), candidate("1.1.1.1", 80), candidate("2.2.2.2", 80)];
        let result = dedup(items, 10);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].ip, "1.1.1.1");

        let truncated = dedup(vec![candidate("1.1.1.1", 80), candidate("2.2.2.2", 80)], 1);
        assert_eq!(truncated.len(), 1);
    }
}
