//! Telegram command listener
//!
//! Long-polls `getUpdates` and maps bot commands onto the engine
//! controller's control operations:
//!
//! - `/start`  - register the chat for notifications (idempotent)
//! - `/status` - report schedule and poll status
//! - `/sleep`  - force the engine quiet
//! - `/wake`   - force the engine active
//! - `/check`  - run one availability check immediately
//!
//! The listener runs as its own task; every handler goes through the
//! controller, never directly at engine state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::engine::EngineController;
use crate::notify::telegram::{TelegramChannel, TelegramUpdate};
use crate::notify::Channel;
use crate::storage::SubscriberRegistry;

/// Delay before re-polling after a getUpdates failure
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Listens for bot commands and drives the controller
pub struct CommandListener {
    telegram: Arc<TelegramChannel>,
    registry: Arc<Mutex<SubscriberRegistry>>,
    controller: EngineController,
    update_timeout_secs: u64,
}

impl CommandListener {
    /// Create a listener over the shared channel and registry
    pub fn new(
        telegram: Arc<TelegramChannel>,
        registry: Arc<Mutex<SubscriberRegistry>>,
        controller: EngineController,
        update_timeout_secs: u64,
    ) -> Self {
        Self {
            telegram,
            registry,
            controller,
            update_timeout_secs,
        }
    }

    /// Poll for updates until the process shuts down
    pub async fn run(&self) {
        tracing::info!("command listener starting");
        let mut offset = 0i64;

        loop {
            match self
                .telegram
                .get_updates(offset, self.update_timeout_secs)
                .await
            {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: TelegramUpdate) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };

        let chat = message.chat.id;
        let command = text.split_whitespace().next().unwrap_or("");

        // Commands may arrive as /status or /status@botname
        let reply = match command.split('@').next().unwrap_or("") {
            "/start" => self.handle_start(chat).await,
            "/status" => self.controller.status().await.to_string(),
            "/sleep" => match self.controller.force_sleep().await {
                Some(_) => "💤 Going quiet; polling paused until /wake.".to_string(),
                None => "Already quiet.".to_string(),
            },
            "/wake" => match self.controller.force_wake().await {
                Some(_) => "🔔 Awake; polling resumed.".to_string(),
                None => "Already active.".to_string(),
            },
            "/check" => match self.controller.run_check_now().await {
                Ok(new) if new.is_empty() => "✅ Checked: nothing new.".to_string(),
                Ok(new) => format!("🎉 Checked: {} new slot(s) announced.", new.len()),
                Err(e) => format!("❌ Check failed: {e}"),
            },
            _ => return,
        };

        if let Err(e) = self.telegram.send(chat, &reply).await {
            tracing::warn!(chat, error = %e, "failed to reply to command");
        }
    }

    async fn handle_start(&self, chat: i64) -> String {
        let added = {
            let mut registry = self.registry.lock().await;
            registry.add(chat)
        };

        match added {
            Ok(true) => "🟢 Registered! You will be notified when tables open up.".to_string(),
            Ok(false) => "🟢 Already registered; watching for availability.".to_string(),
            Err(e) => {
                tracing::error!(chat, error = %e, "failed to persist subscriber");
                "⚠️ Registration could not be saved; please try again.".to_string()
            }
        }
    }
}
