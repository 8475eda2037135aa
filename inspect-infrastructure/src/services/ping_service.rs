use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use inspect_domain::ports::PingService;

/// Posts accepted inspect parameters to an external endpoint without
/// blocking the request.
pub struct HttpPingService {
    url: Option<String>,
    client: Client,
}

impl HttpPingService {
    pub fn new(url: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(3)))
            .build()?;
        Ok(Self { url, client })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

impl PingService for HttpPingService {
    fn spawn_ping(&self, s: &str, a: &str, d: &str, m: &str) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let client = self.client.clone();
        let payload = json!({ "s": s, "a": a, "d": d, "m": m });
        tokio::spawn(async move {
            match send_ping(&client, &url, &payload).await {
                Ok(()) => debug!("inspect ping delivered"),
                Err(err) => warn!("inspect ping failed: {}", err),
            }
        });
    }
}

async fn send_ping(client: &Client, url: &str, payload: &serde_json::Value) -> Result<()> {
    client
        .post(url)
        .json(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_ping_is_a_no_op() {
        let service = HttpPingService::new(None, 5).expect("client");
        assert!(!service.is_enabled());
        service.spawn_ping("0", "1", "2", "3");
    }
}
