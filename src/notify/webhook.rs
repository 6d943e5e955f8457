use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use super::{Ack, NotifyError, Notifier, SEND_TIMEOUT};

/// Posts a small JSON document to an arbitrary endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, text))]
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError> {
        let payload = json!({
            "message": text,
            "channel": channel,
            "timestamp": Utc::now().to_rfc3339()
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            info!("Successfully sent webhook alert");
            Ok(Ack::default())
        } else {
            error!("Webhook alert failed with status: {}", response.status());
            Err(NotifyError::Status(response.status().as_u16()))
        }
    }
}
