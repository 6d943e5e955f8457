//! Outbound notification transports
//!
//! Every transport implements [`Notifier`]. The configured one is picked at startup
//! from [`Alert`](crate::config::Alert) and wrapped in [`AlertTransport`].

pub mod discord;
pub mod slack;
pub mod webhook;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Alert;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;

/// Per-request timeout for every transport
pub(crate) const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Acknowledgement returned by a transport after a successful send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Transport-specific message id, if the transport returns one
    pub id: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError>;
}

/// Errors that can occur while delivering a notification
#[derive(Debug)]
pub enum NotifyError {
    /// The request never produced a response
    Request(reqwest::Error),

    /// Non-success HTTP status
    Status(u16),

    /// The remote API accepted the request but reported a failure
    Api(String),

    /// Response body could not be decoded
    Decode(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Request(err) => write!(f, "notification request failed: {}", err),
            NotifyError::Status(status) => {
                write!(f, "notification rejected with status: {}", status)
            }
            NotifyError::Api(msg) => write!(f, "notification API error: {}", msg),
            NotifyError::Decode(msg) => write!(f, "invalid notification response: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NotifyError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Request(err)
    }
}

/// The transport selected by configuration
#[derive(Debug, Clone)]
pub enum AlertTransport {
    Slack(SlackNotifier),
    Discord(DiscordNotifier),
    Webhook(WebhookNotifier),
}

impl AlertTransport {
    /// Build the transport for `alert`. `credential` is only used by Slack.
    pub fn from_config(alert: &Alert, credential: Option<String>) -> Self {
        match alert {
            Alert::Slack(slack) => AlertTransport::Slack(SlackNotifier::new(
                &slack.api_url,
                credential.unwrap_or_default(),
            )),
            Alert::Discord(discord) => AlertTransport::Discord(DiscordNotifier::new(
                &discord.url,
                discord.user_id.clone(),
            )),
            Alert::Webhook(webhook) => AlertTransport::Webhook(WebhookNotifier::new(&webhook.url)),
        }
    }
}

#[async_trait]
impl Notifier for AlertTransport {
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError> {
        match self {
            AlertTransport::Slack(slack) => slack.send(channel, text).await,
            AlertTransport::Discord(discord) => discord.send(channel, text).await,
            AlertTransport::Webhook(webhook) => webhook.send(channel, text).await,
        }
    }
}
