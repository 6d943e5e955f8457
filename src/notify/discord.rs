use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use super::{Ack, NotifyError, Notifier, SEND_TIMEOUT};

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

const ALERT_COLOR: u32 = 15105570; // Orange

/// Sends alerts to a Discord webhook. The webhook is bound to its channel, so the
/// channel name only appears in the footer.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    url: String,
    user_id: Option<String>,
}

impl DiscordNotifier {
    pub fn new(url: &str, user_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            user_id,
        }
    }

    pub fn build_message(&self, channel: &str, text: &str) -> Message {
        let embed = Embed {
            title: Some("⚠️ Host Alert".to_string()),
            description: Some(text.to_string()),
            color: Some(ALERT_COLOR),
            footer: Some(EmbedFooter {
                text: format!("Channel: {channel}"),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        };

        let mut builder = MessageBuilder::new().add_embed(embed);
        if let Some(user_id) = &self.user_id {
            builder = builder.content(format!("<@{user_id}>"));
        }
        builder.build()
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    #[instrument(skip(self, text))]
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError> {
        let message = self.build_message(channel, text);

        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            info!("Successfully sent Discord message");
            Ok(Ack::default())
        } else {
            let status = response.status();
            error!("Discord message failed with status: {}", status);
            if let Ok(error_text) = response.text().await {
                error!("Discord API error response: {}", error_text);
            }
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}
