//! Webhook registry and event fan-out: posts a signed JSON payload to every active
//! subscriber of an event, never letting one slow or failing subscriber block another.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::models::Webhook;

type HmacSha256 = Hmac<Sha256>;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct WebhookRegistry {
    webhooks: DashMap<String, Webhook>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self { webhooks: DashMap::new() }
    }

    pub fn register(&self, url: String, events: Vec<String>, secret_key: Option<String>) -> Webhook {
        let webhook = Webhook {
            id: Uuid::new_v4().to_string(),
            url,
            events,
            secret_key,
            active: true,
            created_at: Utc::now(),
            last_triggered_at: None,
            failures: 0,
        };
        self.webhooks.insert(webhook.id.clone(), webhook.clone());
        webhook
    }

    pub fn list(&self, skip: usize, limit: usize) -> (Vec<Webhook>, u64) {
        let mut all: Vec<Webhook> = self.webhooks.iter().map(|w| w.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let total = all.len() as u64;
        let page = all.into_iter().skip(skip).take(limit).collect();
        (page, total)
    }

    pub fn remove(&self, id: &str) -> Option<Webhook> {
        self.webhooks.remove(id).map(|(_, w)| w)
    }

    /// Deliver `payload` to every active subscriber of `event`. Delivery failures only
    /// increment that subscriber's `failures` counter; they never abort the fan-out.
    pub async fn trigger(&self, client: &reqwest::Client, event: &str, payload: serde_json::Value) {
        let subscribers: Vec<Webhook> = self
            .webhooks
            .iter()
            .filter(|w| w.active && w.events.iter().any(|e| e == event))
            .map(|w| w.clone())
            .collect();

        let body = compact_json(&payload);
        let deliveries = subscribers.into_iter().map(|webhook| {
            let client = client.clone();
            let body = body.clone();
            let event = event.to_string();
            async move { (webhook.id.clone(), deliver(&client, &webhook, &event, &body).await) }
        });

        let results = futures_util::future::join_all(deliveries).await;
        for (id, delivered) in results {
            if let Some(mut webhook) = self.webhooks.get_mut(&id) {
                if delivered {
                    webhook.last_triggered_at = Some(Utc::now());
                } else {
                    webhook.failures += 1;
                }
            }
        }
    }
}

async fn deliver(client: &reqwest::Client, webhook: &Webhook, event: &str, body: &str) -> bool {
    let mut request = client
        .post(&webhook.url)
        .timeout(DELIVERY_TIMEOUT)
        .header("X-Webhook-Event", event)
        .header("Content-Type", "application/json")
        .body(body.to_string());

    if let Some(secret) = &webhook.secret_key {
        request = request.header("X-Webhook-Signature", compute_signature(secret, body));
    }

    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            log::warn!("webhook delivery to {} failed: {}", webhook.url, e);
            false
        }
    }
}

fn compact_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

pub fn compute_signature(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_hex_hmac() {
        let body = r#"{"a":1}"#;
        let sig1 = compute_signature("secret", body);
        let sig2 = compute_signature("secret", body);
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let body = r#"{"a":1}"#;
        assert_ne!(compute_signature("one", body), compute_signature("two", body));
    }

    #[test]
    fn list_orders_by_registration_and_paginates() {
        let registry = WebhookRegistry::new();
        registry.register("https://a".into(), vec!["e".into()], None);
        registry.register("https://b".into(), vec!["e".into()], None);
        let (page, total) = registry.list(0, 1);
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
    }
}
