//! Handler functions for every control-plane endpoint. Each maps request JSON onto the
//! shared operations in `ops`/`catalog`/`jobs`/`scheduler` and never leaks an internal
//! error type across the boundary.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::catalog::{ListFilters, OrderBy, OrderDirection, RandomFilters};
use crate::config::dynamic::SchedulerConfigUpdate;
use crate::coordinator::ScrapeRequest;
use crate::models::{JobKind, Protocol};
use crate::ops::{self, default_validator_config};
use crate::state::AppState;
use crate::validator::ValidatorConfig;

use super::ApiResponse;

type SharedState = State<Arc<AppState>>;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "version": crate::VERSION}))
}

// ---- scrape / validate (synchronous) ----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ScrapeRequestBody {
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    pub country: Option<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
}

fn default_quantity() -> usize {
    20
}

pub async fn scrape_proxies(
    State(state): SharedState,
    Json(body): Json<ScrapeRequestBody>,
) -> Json<serde_json::Value> {
    let request = ScrapeRequest {
        country: body.country,
        protocols: ops::parse_protocols(&body.protocols),
        sources: body.sources,
        quantity: body.quantity,
        timeout: Duration::from_secs(body.timeout.unwrap_or(state.settings.scraper_timeout_sec)),
        retries: body.retries.unwrap_or(state.settings.scraper_max_retries),
    };
    let outcome = ops::do_scrape(&state, request).await;
    Json(serde_json::json!({
        "success": true,
        "total_found": outcome.total_found,
        "proxies": outcome.proxies,
        "execution_time_ms": outcome.execution_time_ms,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequestBody {
    pub proxies: Vec<String>,
    #[serde(default)]
    pub test_urls: Vec<String>,
    pub timeout: Option<u64>,
    #[serde(default)]
    pub check_anonymity: bool,
    #[serde(default)]
    pub check_geolocation: bool,
    pub concurrent_tests: Option<usize>,
    #[serde(default)]
    pub test_all_urls: bool,
}

pub async fn validate_proxies(
    State(state): SharedState,
    Json(body): Json<ValidateRequestBody>,
) -> Json<serde_json::Value> {
    let mut config = default_validator_config(&state);
    if !body.test_urls.is_empty() {
        config.test_urls = body.test_urls;
    }
    if let Some(timeout) = body.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    config.check_anonymity = body.check_anonymity;
    config.check_geolocation = body.check_geolocation;
    config.test_all_urls = body.test_all_urls;
    if let Some(n) = body.concurrent_tests {
        config.concurrent_tests = n;
    }

    let outcome = ops::do_validate(&state, &body.proxies, config).await;
    Json(serde_json::json!({
        "success": true,
        "total_tested": outcome.total_tested,
        "valid_proxies": outcome.valid_proxies,
        "invalid_proxies": outcome.invalid_proxies,
        "results": outcome.results,
        "execution_time_ms": outcome.execution_time_ms,
    }))
}

// ---- listing / random / stats / export ---------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub valid_only: Option<bool>,
    pub country: Option<String>,
    pub protocol: Option<String>,
    pub anonymity: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

fn filters_from_query(q: &ListQuery) -> ListFilters {
    ListFilters {
        valid_only: q.valid_only.unwrap_or(false),
        country: q.country.clone(),
        protocol: q.protocol.as_deref().and_then(|p| p.parse::<Protocol>().ok()),
        anonymity: q.anonymity.as_deref().and_then(ops::parse_anonymity),
    }
}

pub async fn list_proxies(
    State(state): SharedState,
    Query(q): Query<ListQuery>,
) -> Json<super::PaginatedResponse<crate::models::ProxyRecord>> {
    let page = q.page.unwrap_or(1).max(1);
    let per_page = q.per_page.unwrap_or(50).max(1);
    let filters = filters_from_query(&q);
    let order_by = OrderBy::parse(q.order_by.as_deref());
    let order = OrderDirection::parse(q.order.as_deref());

    let (rows, total) = state.catalog.list(page, per_page, &filters, order_by, order);
    Json(super::PaginatedResponse::new(rows, total, page, per_page))
}

#[derive(Debug, Deserialize, Default)]
pub struct RandomQuery {
    pub protocol: Option<String>,
    pub country: Option<String>,
    pub max_response_time: Option<u64>,
    pub anonymity: Option<String>,
}

pub async fn random_proxy(
    State(state): SharedState,
    Query(q): Query<RandomQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiResponse<()>>)> {
    let filters = RandomFilters {
        protocol: q.protocol.as_deref().and_then(|p| p.parse::<Protocol>().ok()),
        country: q.country,
        anonymity: q.anonymity.as_deref().and_then(ops::parse_anonymity),
        max_response_time_ms: q.max_response_time,
    };
    match state.catalog.pick_random(&filters) {
        Some(record) => Ok(Json(serde_json::to_value(record).unwrap_or_default())),
        None => Err(not_found_response()),
    }
}

pub async fn proxy_stats(State(state): SharedState) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.catalog.stats()).unwrap_or_default())
}

#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub valid_only: Option<bool>,
    pub country: Option<String>,
    pub protocol: Option<String>,
    pub anonymity: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

pub async fn export_proxies(State(state): SharedState, Query(q): Query<ExportQuery>) -> axum::response::Response {
    use axum::response::IntoResponse;

    let filters = ListFilters {
        valid_only: q.valid_only.unwrap_or(false),
        country: q.country.clone(),
        protocol: q.protocol.as_deref().and_then(|p| p.parse::<Protocol>().ok()),
        anonymity: q.anonymity.as_deref().and_then(ops::parse_anonymity),
    };
    let order_by = OrderBy::parse(q.order_by.as_deref());
    let order = OrderDirection::parse(q.order.as_deref());
    let rows = state.catalog.filtered(&filters, order_by, order);

    if q.format.as_deref() == Some("csv") {
        let body = rows
            .iter()
            .map(|r| format!("{}:{}", r.ip, r.port))
            .collect::<Vec<_>>()
            .join("\n");
        (
            StatusCode::OK,
            [("content-type", "text/plain")],
            body,
        )
            .into_response()
    } else {
        Json(rows).into_response()
    }
}

pub async fn get_proxy(
    State(state): SharedState,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .catalog
        .get(&id)
        .map(|r| Json(serde_json::to_value(r).unwrap_or_default()))
        .ok_or_else(not_found_response)
}

#[derive(Debug, Deserialize)]
pub struct PatchProxyBody {
    pub country: Option<String>,
    pub anonymity: Option<String>,
}

pub async fn patch_proxy(
    State(state): SharedState,
    Path(id): Path<String>,
    Json(body): Json<PatchProxyBody>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiResponse<()>>)> {
    let anonymity = body.anonymity.as_deref().and_then(ops::parse_anonymity);
    state
        .catalog
        .patch(&id, body.country, anonymity)
        .map(|r| Json(serde_json::to_value(r).unwrap_or_default()))
        .ok_or_else(not_found_response)
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    pub invalid_only: Option<bool>,
}

pub async fn delete_proxies(State(state): SharedState, Query(q): Query<DeleteQuery>) -> Json<serde_json::Value> {
    let deleted = state.catalog.delete(q.invalid_only.unwrap_or(false));
    Json(serde_json::json!({"success": true, "deleted_count": deleted}))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequestBody {
    pub proxies: Vec<String>,
    #[serde(default)]
    pub auto_validate: bool,
    #[serde(default)]
    pub validation_urls: Vec<String>,
}

pub async fn import_proxies(
    State(state): SharedState,
    Json(body): Json<ImportRequestBody>,
) -> Json<serde_json::Value> {
    let outcome = ops::do_import(&state, &body.proxies);

    let polling_url = if body.auto_validate && !body.validation_urls.is_empty() {
        let job = state.jobs.create(JobKind::Validate);
        let job_id = job.id.clone();
        let state = state.clone();
        let lines = body.proxies.clone();
        let mut config = default_validator_config(&state);
        config.test_urls = body.validation_urls;
        tokio::spawn(async move {
            let outcome = ops::do_validate(&state, &lines, config).await;
            state.jobs.complete(
                &job_id,
                serde_json::json!({
                    "total_tested": outcome.total_tested,
                    "valid": outcome.valid_proxies,
                    "invalid": outcome.invalid_proxies,
                }),
            );
        });
        Some(format!("/jobs/{}", job.id))
    } else {
        None
    };

    Json(serde_json::json!({
        "success": true,
        "imported": outcome.imported,
        "duplicates": outcome.duplicates,
        "validation_started": polling_url.is_some(),
        "polling_url": polling_url,
    }))
}

// ---- scheduled jobs / job polling ---------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScheduleRequestBody {
    Validate(ValidateRequestBody),
    Scrape(ScrapeRequestBody),
}

pub async fn schedule_job(State(state): SharedState, Json(body): Json<ScheduleRequestBody>) -> Json<serde_json::Value> {
    let (kind, job_id) = match body {
        ScheduleRequestBody::Scrape(body) => {
            let job = state.jobs.create(JobKind::Scrape);
            let job_id = job.id.clone();
            let request = ScrapeRequest {
                country: body.country,
                protocols: ops::parse_protocols(&body.protocols),
                sources: body.sources,
                quantity: body.quantity,
                timeout: Duration::from_secs(body.timeout.unwrap_or(state.settings.scraper_timeout_sec)),
                retries: body.retries.unwrap_or(state.settings.scraper_max_retries),
            };
            let state = state.clone();
            let job_id_inner = job_id.clone();
            tokio::spawn(async move {
                let outcome = ops::do_scrape(&state, request).await;
                state.jobs.complete(
                    &job_id_inner,
                    serde_json::json!({
                        "total_found": outcome.total_found,
                        "saved": outcome.total_found,
                        "by_source": outcome.by_source,
                    }),
                );
            });
            ("scrape", job_id)
        }
        ScheduleRequestBody::Validate(body) => {
            let job = state.jobs.create(JobKind::Validate);
            let job_id = job.id.clone();
            let mut config: ValidatorConfig = default_validator_config(&state);
            if !body.test_urls.is_empty() {
                config.test_urls = body.test_urls;
            }
            config.check_anonymity = body.check_anonymity;
            config.check_geolocation = body.check_geolocation;
            config.test_all_urls = body.test_all_urls;
            if let Some(n) = body.concurrent_tests {
                config.concurrent_tests = n;
            }
            let lines = body.proxies;
            let state = state.clone();
            let job_id_inner = job_id.clone();
            tokio::spawn(async move {
                let outcome = ops::do_validate(&state, &lines, config).await;
                state.jobs.complete(
                    &job_id_inner,
                    serde_json::json!({
                        "total_tested": outcome.total_tested,
                        "valid": outcome.valid_proxies,
                        "invalid": outcome.invalid_proxies,
                    }),
                );
            });
            ("validate", job_id)
        }
    };

    Json(serde_json::json!({
        "job_id": job_id,
        "status": "processing",
        "polling_url": format!("/jobs/{}", job_id),
        "kind": kind,
    }))
}

pub async fn get_job(
    State(state): SharedState,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .jobs
        .get(&id)
        .map(|job| Json(serde_json::to_value(job).unwrap_or_default()))
        .ok_or_else(not_found_response)
}

// ---- scheduler control ---------------------------------------------------------------

pub async fn scheduler_status(State(state): SharedState) -> Json<serde_json::Value> {
    let config = state.scheduler_config.read().clone();
    let scheduler_state = state.scheduler_state.read().clone();
    Json(serde_json::json!({
        "config": config,
        "running": scheduler_state.running,
        "last_validate_at": scheduler_state.last_validate_at,
        "last_scrape_at": scheduler_state.last_scrape_at,
        "last_validate_job_id": scheduler_state.last_validate_job_id,
        "last_scrape_job_id": scheduler_state.last_scrape_job_id,
        "last_validate_metrics": scheduler_state.last_validate_metrics,
        "last_scrape_metrics": scheduler_state.last_scrape_metrics,
    }))
}

pub async fn update_scheduler(
    State(state): SharedState,
    Json(update): Json<SchedulerConfigUpdate>,
) -> Json<serde_json::Value> {
    let mut config = state.scheduler_config.write();
    config.apply_update(update);
    Json(serde_json::to_value(&*config).unwrap_or_default())
}

// ---- webhooks --------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterWebhookBody {
    pub url: String,
    pub events: Vec<String>,
    pub secret_key: Option<String>,
}

pub async fn register_webhook(
    State(state): SharedState,
    Json(body): Json<RegisterWebhookBody>,
) -> Json<serde_json::Value> {
    let webhook = state.webhooks.register(body.url, body.events, body.secret_key);
    Json(serde_json::to_value(webhook).unwrap_or_default())
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct WebhookListResponse {
    webhooks: Vec<crate::models::Webhook>,
    total: u64,
}

pub async fn list_webhooks(State(state): SharedState, Query(q): Query<WebhookListQuery>) -> Json<serde_json::Value> {
    let (webhooks, total) = state.webhooks.list(q.skip.unwrap_or(0), q.limit.unwrap_or(50));
    Json(serde_json::to_value(WebhookListResponse { webhooks, total }).unwrap_or_default())
}

pub async fn delete_webhook(
    State(state): SharedState,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .webhooks
        .remove(&id)
        .map(|w| Json(serde_json::to_value(w).unwrap_or_default()))
        .ok_or_else(not_found_response)
}

fn not_found_response() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("not found")))
}

pub async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("endpoint not found")))
}
