//! Webhook delivery: single POST, bearer token, at-most-once.
//!
//! A non-2xx or transport-error response is logged and not retried — the
//! task's own lifecycle has already moved on by the time the webhook fires.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::warn;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookPayload {
    Running {
        task_id: String,
    },
    Completed {
        task_id: String,
        result_data: serde_json::Value,
        result_files: Vec<String>,
        session_data: SessionData,
        activity_log: Vec<serde_json::Value>,
    },
    Failed {
        task_id: String,
        error_message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub iterations: u32,
    pub events: Vec<serde_json::Value>,
}

pub struct WebhookSender {
    client: Client,
    base_url: String,
    secret: String,
}

impl WebhookSender {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { client: Client::builder().timeout(WEBHOOK_TIMEOUT).build().expect("reqwest client builds with a fixed timeout"), base_url: base_url.into(), secret: secret.into() }
    }

    pub async fn send(&self, payload: &WebhookPayload) {
        let url = &self.base_url;
        let response = self.client.post(url).bearer_auth(&self.secret).json(payload).send().await;

        match response {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!(%status, %body, "WebhookSender::send: non-2xx response, not retrying");
            }
            Err(e) => {
                warn!(error = %e, "WebhookSender::send: transport error, not retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_tagged_status() {
        let payload = WebhookPayload::Running { task_id: "T-1".to_string() };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["task_id"], "T-1");
    }

    #[test]
    fn test_failed_payload_carries_error_message() {
        let payload = WebhookPayload::Failed { task_id: "T-1".to_string(), error_message: "boom".to_string() };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_message"], "boom");
    }
}
