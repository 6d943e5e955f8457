use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use super::{Ack, NotifyError, Notifier, SEND_TIMEOUT};

/// Posts alerts through the Slack Web API `chat.postMessage` method.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    api_url: String,
    token: String,
}

// token stays out of logs
impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(api_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    #[instrument(skip(self, text))]
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let payload = json!({
            "channel": channel,
            "text": text,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            error!("Slack message failed with status: {}", response.status());
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<PostMessageResponse>()
            .await
            .map_err(|e| NotifyError::Decode(e.to_string()))?;

        if !body.ok {
            let reason = body.error.unwrap_or_else(|| "unknown error".to_string());
            error!("Slack API error response: {}", reason);
            return Err(NotifyError::Api(reason));
        }

        info!("Successfully sent Slack message");
        Ok(Ack { id: body.ts })
    }
}
