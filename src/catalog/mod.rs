//! In-memory catalog store: the only durable state this service owns.
//!
//! Backed by a sharded concurrent map (`dashmap`) keyed by surrogate id, with a
//! secondary index from proxy identity `(ip, port, protocol)` to id so `upsert` stays
//! O(1). Guards only ever wrap a single record's short field updates.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;

use chrono::Utc;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::models::{Anonymity, Protocol, ProxyKey, ProxyRecord};

#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub valid_only: bool,
    pub country: Option<String>,
    pub protocol: Option<Protocol>,
    pub anonymity: Option<Anonymity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    AvgResponseTimeMs,
    LastChecked,
    CreatedAt,
}

impl OrderBy {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("avg_response_time_ms") => Some(OrderBy::AvgResponseTimeMs),
            Some("last_checked") => Some(OrderBy::LastChecked),
            Some("created_at") => Some(OrderBy::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => OrderDirection::Asc,
            _ => OrderDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RandomFilters {
    pub protocol: Option<Protocol>,
    pub country: Option<String>,
    pub anonymity: Option<Anonymity>,
    pub max_response_time_ms: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStats {
    pub source: String,
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogStats {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub by_protocol: HashMap<String, u64>,
    pub by_country: Vec<(String, u64)>,
    pub avg_response_time_ms: Option<f64>,
    pub success_rate: f64,
    pub by_source: Vec<SourceStats>,
}

/// Shared, thread-safe proxy catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    records: DashMap<String, ProxyRecord>,
    index: DashMap<ProxyKey, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            index: DashMap::new(),
        }
    }

    /// Insert a new record or refresh an existing one's `country`/`source`.
    /// A `None` argument never erases a previously observed value.
    pub fn upsert(
        &self,
        ip: &str,
        port: u16,
        protocol: Protocol,
        country: Option<String>,
        source: Option<String>,
    ) -> ProxyRecord {
        let key: ProxyKey = (ip.to_string(), port, protocol);
        if let Some(id) = self.index.get(&key).map(|r| r.clone()) {
            let mut entry = self.records.get_mut(&id).expect("index/records desynced");
            if country.is_some() {
                entry.country = country;
            }
            if source.is_some() {
                entry.source = source;
            }
            entry.last_updated = Utc::now();
            return entry.clone();
        }

        let now = Utc::now();
        let record = ProxyRecord {
            id: Uuid::new_v4().to_string(),
            ip: ip.to_string(),
            port,
            protocol,
            country,
            source,
            valid: false,
            anonymity: None,
            last_checked: None,
            avg_response_time_ms: None,
            created_at: now,
            last_updated: now,
        };
        self.index.insert(key, record.id.clone());
        self.records.insert(record.id.clone(), record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Option<ProxyRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    pub fn set_validation(
        &self,
        id: &str,
        valid: bool,
        anonymity: Option<Anonymity>,
        avg_response_time_ms: Option<u64>,
    ) -> Option<ProxyRecord> {
        let mut entry = self.records.get_mut(id)?;
        entry.valid = valid;
        entry.anonymity = anonymity;
        entry.avg_response_time_ms = avg_response_time_ms;
        let now = Utc::now();
        entry.last_checked = Some(now);
        entry.last_updated = now;
        Some(entry.clone())
    }

    pub fn patch(
        &self,
        id: &str,
        country: Option<String>,
        anonymity: Option<Anonymity>,
    ) -> Option<ProxyRecord> {
        let mut entry = self.records.get_mut(id)?;
        if country.is_some() {
            entry.country = country;
        }
        if anonymity.is_some() {
            entry.anonymity = anonymity;
        }
        entry.last_updated = Utc::now();
        Some(entry.clone())
    }

    fn matches(filters: &ListFilters, r: &ProxyRecord) -> bool {
        if filters.valid_only && !r.valid {
            return false;
        }
        if let Some(country) = &filters.country {
            if r.country.as_deref() != Some(country.as_str()) {
                return false;
            }
        }
        if let Some(protocol) = filters.protocol {
            if r.protocol != protocol {
                return false;
            }
        }
        if let Some(anonymity) = filters.anonymity {
            if r.anonymity != Some(anonymity) {
                return false;
            }
        }
        true
    }

    /// Comparator shared by `list` and `export` so null placement never diverges
    /// between the two call sites (see the unified nulls policy in the design notes).
    fn compare(order_by: OrderBy, order: OrderDirection, a: &ProxyRecord, b: &ProxyRecord) -> CmpOrdering {
        let ordering = match order_by {
            OrderBy::AvgResponseTimeMs => {
                compare_nullable(a.avg_response_time_ms, b.avg_response_time_ms, order)
            }
            OrderBy::LastChecked => compare_nullable(
                a.last_checked.map(|t| t.timestamp_millis()),
                b.last_checked.map(|t| t.timestamp_millis()),
                order,
            ),
            OrderBy::CreatedAt => {
                let cmp = a.created_at.cmp(&b.created_at);
                if order == OrderDirection::Desc {
                    cmp.reverse()
                } else {
                    cmp
                }
            }
        };
        ordering
    }

    /// Filtered, ordered rows with no pagination applied — used by `/proxies/export`.
    pub fn filtered(
        &self,
        filters: &ListFilters,
        order_by: Option<OrderBy>,
        order: OrderDirection,
    ) -> Vec<ProxyRecord> {
        let mut rows: Vec<ProxyRecord> = self
            .records
            .iter()
            .map(|r| r.clone())
            .filter(|r| Self::matches(filters, r))
            .collect();
        if let Some(order_by) = order_by {
            rows.sort_by(|a, b| Self::compare(order_by, order, a, b));
        }
        rows
    }

    pub fn list(
        &self,
        page: u32,
        per_page: u32,
        filters: &ListFilters,
        order_by: Option<OrderBy>,
        order: OrderDirection,
    ) -> (Vec<ProxyRecord>, u64) {
        let rows = self.filtered(filters, order_by, order);
        let total = rows.len() as u64;
        let page = page.max(1);
        let per_page = per_page.max(1);
        let start = ((page - 1) as usize) * (per_page as usize);
        let page_rows = rows.into_iter().skip(start).take(per_page as usize).collect();
        (page_rows, total)
    }

    pub fn pick_random(&self, filters: &RandomFilters) -> Option<ProxyRecord> {
        let candidates: Vec<ProxyRecord> = self
            .records
            .iter()
            .map(|r| r.clone())
            .filter(|r| {
                if !r.valid {
                    return false;
                }
                if let Some(protocol) = filters.protocol {
                    if r.protocol != protocol {
                        return false;
                    }
                }
                if let Some(country) = &filters.country {
                    if r.country.as_deref() != Some(country.as_str()) {
                        return false;
                    }
                }
                if let Some(anonymity) = filters.anonymity {
                    if r.anonymity != Some(anonymity) {
                        return false;
                    }
                }
                if let Some(max_ms) = filters.max_response_time_ms {
                    match r.avg_response_time_ms {
                        Some(ms) if ms <= max_ms => {}
                        _ => return false,
                    }
                }
                true
            })
            .collect();
        candidates.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn delete(&self, invalid_only: bool) -> u64 {
        let ids_to_remove: Vec<String> = self
            .records
            .iter()
            .filter(|r| !invalid_only || !r.valid)
            .map(|r| r.id.clone())
            .collect();
        for id in &ids_to_remove {
            if let Some((_, record)) = self.records.remove(id) {
                self.index.remove(&record.key());
            }
        }
        ids_to_remove.len() as u64
    }

    pub fn stats(&self) -> CatalogStats {
        let rows: Vec<ProxyRecord> = self.records.iter().map(|r| r.clone()).collect();
        let total = rows.len() as u64;
        let valid = rows.iter().filter(|r| r.valid).count() as u64;
        let invalid = total - valid;

        let mut by_protocol: HashMap<String, u64> = HashMap::new();
        let mut by_country: HashMap<String, u64> = HashMap::new();
        let mut by_source: HashMap<String, (u64, u64, Vec<u64>)> = HashMap::new();
        let mut valid_latencies = Vec::new();

        for r in &rows {
            *by_protocol.entry(r.protocol.to_string()).or_insert(0) += 1;
            if let Some(country) = &r.country {
                *by_country.entry(country.clone()).or_insert(0) += 1;
            }
            let source_key = r.source.clone().unwrap_or_else(|| "unknown".to_string());
            let entry = by_source.entry(source_key).or_insert((0, 0, Vec::new()));
            entry.0 += 1;
            if r.valid {
                entry.1 += 1;
                if let Some(ms) = r.avg_response_time_ms {
                    entry.2.push(ms);
                    valid_latencies.push(ms);
                }
            }
        }

        let mut by_country: Vec<(String, u64)> = by_country.into_iter().collect();
        by_country.sort_by(|a, b| b.1.cmp(&a.1));
        by_country.truncate(10);

        let mut by_source: Vec<SourceStats> = by_source
            .into_iter()
            .map(|(source, (total, valid, latencies))| {
                let avg = if latencies.is_empty() {
                    None
                } else {
                    Some(latencies.iter().sum::<u64>() as f64 / latencies.len() as f64)
                };
                SourceStats {
                    source,
                    total,
                    valid,
                    invalid: total - valid,
                    success_rate: if total > 0 { valid as f64 / total as f64 } else { 0.0 },
                    avg_response_time_ms: avg,
                }
            })
            .collect();
        by_source.sort_by(|a, b| a.source.cmp(&b.source));

        let avg_response_time_ms = if valid_latencies.is_empty() {
            None
        } else {
            Some(valid_latencies.iter().sum::<u64>() as f64 / valid_latencies.len() as f64)
        };

        CatalogStats {
            total,
            valid,
            invalid,
            by_protocol,
            by_country,
            avg_response_time_ms,
            success_rate: if total > 0 { valid as f64 / total as f64 } else { 0.0 },
            by_source,
        }
    }

    /// Never-checked rows first, then oldest `last_checked`, bounded to `limit`.
    pub fn select_for_validation(
        &self,
        limit: usize,
        valid_only: bool,
        protocols: Option<&[Protocol]>,
    ) -> Vec<ProxyRecord> {
        let mut rows: Vec<ProxyRecord> = self
            .records
            .iter()
            .map(|r| r.clone())
            .filter(|r| !valid_only || r.valid)
            .filter(|r| protocols.map(|p| p.contains(&r.protocol)).unwrap_or(true))
            .collect();
        rows.sort_by(|a, b| match (a.last_checked, b.last_checked) {
            (None, None) => CmpOrdering::Equal,
            (None, Some(_)) => CmpOrdering::Less,
            (Some(_), None) => CmpOrdering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        });
        rows.truncate(limit);
        rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn compare_nullable<T: Ord>(a: Option<T>, b: Option<T>, order: OrderDirection) -> CmpOrdering {
    match (a, b, order) {
        (None, None, _) => CmpOrdering::Equal,
        (None, Some(_), OrderDirection::Asc) => CmpOrdering::Less,
        (None, Some(_), OrderDirection::Desc) => CmpOrdering::Greater,
        (Some(_), None, OrderDirection::Asc) => CmpOrdering::Greater,
        (Some(_), None, OrderDirection::Desc) => CmpOrdering::Less,
        (Some(x), Some(y), OrderDirection::Asc) => x.cmp(&y),
        (Some(x), Some(y), OrderDirection::Desc) => y.cmp(&x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_preserves_country_on_null_update() {
        let catalog = Catalog::new();
        catalog.upsert("1.2.3.4", 8080, Protocol::Http, Some("US".into()), Some("s1".into()));
        let record = catalog.upsert("1.2.3.4", 8080, Protocol::Http, None, None);
        assert_eq!(record.country.as_deref(), Some("US"));
    }

    #[test]
    fn delete_invalid_only_removes_only_invalid() {
        let catalog = Catalog::new();
        let a = catalog.upsert("1.1.1.1", 80, Protocol::Http, None, None);
        let b = catalog.upsert("2.2.2.2", 80, Protocol::Http, None, None);
        catalog.set_validation(&a.id, true, None, Some(10));
        catalog.set_validation(&b.id, false, None, None);
        let deleted = catalog.delete(true);
        assert_eq!(deleted, 1);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(&a.id).is_some());
    }

    #[test]
    fn list_orders_nulls_last_ascending_and_first_descending() {
        let catalog = Catalog::new();
        let a = catalog.upsert("1.1.1.1", 80, Protocol::Http, None, None);
        let b = catalog.upsert("2.2.2.2", 80, Protocol::Http, None, None);
        let c = catalog.upsert("3.3.3.3", 80, Protocol::Http, None, None);
        catalog.set_validation(&a.id, true, None, Some(50));
        catalog.set_validation(&b.id, true, None, Some(20));
        catalog.set_validation(&c.id, true, None, None);

        let (asc, _) = catalog.list(1, 10, &ListFilters::default(), Some(OrderBy::AvgResponseTimeMs), OrderDirection::Asc);
        assert_eq!(asc[0].id, c.id);

        let (desc, _) = catalog.list(1, 10, &ListFilters::default(), Some(OrderBy::AvgResponseTimeMs), OrderDirection::Desc);
        assert_eq!(desc[0].id, a.id);
        assert_eq!(desc[2].id, c.id);
    }

    #[test]
    fn pick_random_respects_filters_and_validity() {
        let catalog = Catalog::new();
        let a = catalog.upsert("1.1.1.1", 80, Protocol::Http, Some("US".into()), None);
        catalog.set_validation(&a.id, true, None, Some(25));
        let b = catalog.upsert("2.2.2.2", 80, Protocol::Http, Some("BR".into()), None);
        catalog.set_validation(&b.id, true, None, Some(70));

        let picked = catalog.pick_random(&RandomFilters {
            protocol: Some(Protocol::Http),
            country: Some("US".into()),
            max_response_time_ms: Some(30),
            ..Default::default()
        });
        assert_eq!(picked.unwrap().id, a.id);

        let none = catalog.pick_random(&RandomFilters {
            country: Some("BR".into()),
            max_response_time_ms: Some(30),
            ..Default::default()
        });
        assert!(none.is_none());
    }

    #[test]
    fn stats_totals_are_consistent() {
        let catalog = Catalog::new();
        let a = catalog.upsert("1.1.1.1", 80, Protocol::Http, None, Some("src".into()));
        let b = catalog.upsert("2.2.2.2", 443, Protocol::Https, None, Some("src".into()));
        catalog.set_validation(&a.id, true, None, Some(10));
        catalog.set_validation(&b.id, false, None, None);
        let stats = catalog.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid + stats.invalid, stats.total);
        assert_eq!(stats.by_protocol.values().sum::<u64>(), stats.total);
    }
}
