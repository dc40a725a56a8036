//! Shared helpers for integration tests
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use tavolo::config::{EngineConfig, SourceConfig};
use tavolo::notify::{Channel, ChannelError};

/// Channel that records every delivery instead of talking to Telegram
pub struct RecordingChannel {
    pub sent: StdMutex<Vec<(i64, String)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: StdMutex::new(Vec::new()),
        })
    }

    /// Messages delivered so far, in delivery order
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, subscriber: i64, text: &str) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((subscriber, text.to_string()));
        Ok(())
    }
}

/// Source config pointing at a mock server
pub fn source_config(url: &str) -> SourceConfig {
    SourceConfig {
        url: url.to_string(),
        date_from: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
        date_to: NaiveDate::from_ymd_opt(2025, 12, 12).unwrap(),
        party_size: 2,
        channel_code: "ONLINE".to_string(),
        area_id: None,
        promotion_id: None,
        request_timeout_secs: 5,
    }
}

/// Engine config with short intervals suitable for tests
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 1,
        quiet_recheck_secs: 1,
        backoff_base_secs: 1,
        backoff_cap_secs: 300,
        dispatch_concurrency: 4,
        notify_on_source_failure: false,
    }
}
