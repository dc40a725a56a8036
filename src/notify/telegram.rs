//! Telegram Bot API channel
//!
//! Sends messages through `sendMessage` and long-polls `getUpdates` for the
//! command listener. The API base is configurable so tests can point the
//! channel at a mock server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Channel, ChannelError};
use crate::config::TelegramConfig;
use crate::storage::subscribers::Subscriber;

/// Envelope every Bot API response arrives in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// One update from getUpdates
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

/// An incoming message
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

/// The chat a message arrived from
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Telegram notification channel
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramChannel {
    /// Create a channel from the bot configuration
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidConfig` when the token is empty and
    /// `ChannelError::Http` when the HTTP client cannot be created.
    pub fn new(config: &TelegramConfig) -> Result<Self, ChannelError> {
        if config.bot_token.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "bot token is empty; set BOT_TOKEN".to_string(),
            ));
        }

        // getUpdates holds the connection open for update_timeout_secs, so
        // the client timeout must sit above it
        let client = Client::builder()
            .timeout(Duration::from_secs(config.update_timeout_secs + 15))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Long-poll for incoming updates starting at `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<TelegramUpdate>, ChannelError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", timeout_secs as i64)])
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| ChannelError::Transient(format!("unreadable getUpdates body: {e}")))?;

        if !body.ok {
            let desc = body.description.unwrap_or_else(|| status.to_string());
            return Err(classify_api_failure(status.as_u16(), desc));
        }

        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, subscriber: Subscriber, text: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": subscriber,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(chat = subscriber, "message delivered");
            return Ok(());
        }

        let description = response
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .ok()
            .and_then(|b| b.description)
            .unwrap_or_else(|| status.to_string());

        Err(classify_api_failure(status.as_u16(), description))
    }
}

/// Map an API failure status to transient or permanent.
///
/// 429 and server-side errors clear on their own; other client errors
/// (blocked bot, unknown chat, bad token) will not.
fn classify_api_failure(status: u16, description: String) -> ChannelError {
    if status == 429 || status >= 500 {
        ChannelError::Transient(format!("HTTP {status}: {description}"))
    } else {
        ChannelError::Permanent(format!("HTTP {status}: {description}"))
    }
}
