//! HTTP client for the reservation availability endpoint
//!
//! Sends the fixed-window availability request and extracts the list of raw
//! availability records from the loosely-structured response. Retry pacing is
//! not handled here: the poll engine owns cross-cycle backoff, so a single
//! attempt per cycle is the contract.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::SourceError;
use crate::config::SourceConfig;
use crate::models::AvailabilityItem;

/// Known names of the field carrying the availability record list, probed in
/// order. The first alias is what the upstream API actually uses today; the
/// rest tolerate casing and naming drift.
const LIST_ALIASES: &[&str] = &[
    "AvailableDates",
    "availableDates",
    "Availability",
    "availability",
    "AvailableTimeSlots",
    "Dates",
    "dates",
    "Results",
    "results",
];

/// Request body for AvailabilityForDateRange
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityRequest {
    #[serde(rename = "DateFrom")]
    pub date_from: String,

    #[serde(rename = "DateTo")]
    pub date_to: String,

    #[serde(rename = "PartySize")]
    pub party_size: u32,

    #[serde(rename = "ChannelCode")]
    pub channel_code: String,

    #[serde(rename = "AreaId")]
    pub area_id: Option<i64>,

    #[serde(rename = "PromotionId")]
    pub promotion_id: Option<i64>,
}

impl AvailabilityRequest {
    /// Build the request body from the deployment configuration
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            date_from: config.date_from.format("%Y-%m-%dT00:00:00").to_string(),
            date_to: config.date_to.format("%Y-%m-%dT00:00:00").to_string(),
            party_size: config.party_size,
            channel_code: config.channel_code.clone(),
            area_id: config.area_id,
            promotion_id: config.promotion_id,
        }
    }
}

/// Client for the availability source collaborator
pub struct AvailabilitySource {
    client: Client,
    config: SourceConfig,
}

impl AvailabilitySource {
    /// Create a new source client
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Http` if the HTTP client cannot be created
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// The endpoint this client polls
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Perform one availability check: POST the configured window and return
    /// the raw records found in the response.
    ///
    /// Absence of any recognized list field is "no data", not an error; an
    /// unparseable body is `SourceError::Malformed`.
    pub async fn check(&self) -> Result<Vec<AvailabilityItem>, SourceError> {
        let body = self.fetch_window().await?;
        Ok(extract_records(&body))
    }

    /// Fetch the raw response document for the configured date window
    pub async fn fetch_window(&self) -> Result<Value, SourceError> {
        let request = AvailabilityRequest::from_config(&self.config);

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout
                } else {
                    SourceError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Http(e)
            }
        })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::Malformed(format!("invalid JSON: {e}")))
    }
}

/// Extract the availability record list from an arbitrary response document.
///
/// Probes the known list-field aliases on a top-level object, falls back to
/// treating the whole body as the list when the body itself is an array, and
/// yields no records otherwise.
pub fn extract_records(body: &Value) -> Vec<AvailabilityItem> {
    let list = match body {
        Value::Object(map) => LIST_ALIASES
            .iter()
            .find_map(|alias| map.get(*alias).and_then(Value::as_array)),
        Value::Array(items) => Some(items),
        _ => None,
    };

    match list {
        Some(items) => items
            .iter()
            .cloned()
            .map(AvailabilityItem::from_value)
            .collect(),
        None => {
            tracing::debug!("no recognized availability list in response body");
            Vec::new()
        }
    }
}
