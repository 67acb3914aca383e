use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::dispatch::{DispatchError, PushTransport};

/// Expo push service client.
/// Docs: <https://docs.expo.dev/push-notifications/sending-notifications/>
#[derive(Clone)]
pub struct ExpoPush {
    http: Client,
    url: String,
}

#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
}

impl ExpoPush {
    pub fn new(url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ExpoPush {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl PushTransport for ExpoPush {
    fn name(&self) -> &str {
        "Expo"
    }

    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), DispatchError> {
        debug!("Publishing push to {}", token);
        let resp = self
            .http
            .post(&self.url)
            .json(&PushMessage { to: token, title, body })
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Transport(format!("{}: {}", status, text)));
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| DispatchError::Transport(format!("unreadable push ticket: {}", e)))?;
        check_ticket(&raw)
    }
}

/// A 2xx response can still carry an error ticket.
fn check_ticket(raw: &serde_json::Value) -> Result<(), DispatchError> {
    let ticket = &raw["data"];
    if ticket["status"].as_str() == Some("error") {
        let message = ticket["message"].as_str().unwrap_or("unknown push error");
        let detail = ticket["details"]["error"].as_str().unwrap_or("");
        return Err(DispatchError::Transport(
            format!("{} {}", message, detail).trim().to_string(),
        ));
    }
    if let Some(errors) = raw["errors"].as_array() {
        if let Some(first) = errors.first() {
            return Err(DispatchError::Transport(
                first["message"].as_str().unwrap_or("push rejected").to_string(),
            ));
        }
    }
    Ok(())
}

/// Dry-run transport: logs instead of sending.
pub struct LogOnlyPush;

#[async_trait]
impl PushTransport for LogOnlyPush {
    fn name(&self) -> &str {
        "log-only"
    }

    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), DispatchError> {
        info!("[dry-run] push to {}: {} | {}", token, title, body);
        Ok(())
    }
}
