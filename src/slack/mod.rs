//! Slack glue: Events API endpoint, request signatures and the reply sink.

pub mod events;
pub mod server;
pub mod signature;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::core::config::SlackConfig;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("failed to reach Slack API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API error: {0}")]
    Api(String),
}

/// Where replies go. Posting an empty reply is left to the caller to avoid.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn say(&self, channel: &str, thread_ts: Option<&str>, text: &str)
    -> Result<(), SlackError>;
}

/// Minimal Slack Web API client (bot token auth)
pub struct SlackClient {
    client: Client,
    bot_token: String,
    api_url: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl ReplySink for SlackClient {
    async fn say(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let result: ApiResult = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&PostMessage {
                channel,
                text,
                thread_ts,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Slack answers 200 with ok=false for application-level errors
        if !result.ok {
            let reason = result.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(channel, err = %reason, "chat.postMessage rejected");
            return Err(SlackError::Api(reason));
        }

        debug!(channel, text_len = text.len(), "reply posted");
        Ok(())
    }
}
