use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::Result;

/// Client for the article feed endpoint.
pub struct Api {
    client: Client,
    feed_url: String,
}

impl Api {
    pub fn new(feed_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("xyz-reader/1.0")
            .build()?;

        Ok(Self {
            client,
            feed_url: feed_url.into(),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Fetch the feed once and parse it as a JSON array.
    ///
    /// Returns `None` when the request fails or the body is not an array;
    /// the cause is logged.
    pub async fn fetch_json_array(&self) -> Option<Vec<Value>> {
        let body = match self.fetch_plain_text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Error fetching items JSON from {}: {}", self.feed_url, e);
                return None;
            }
        };

        match parse_json_array(&body) {
            Ok(items) => {
                tracing::debug!("Fetched {} items from {}", items.len(), self.feed_url);
                Some(items)
            }
            Err(e) => {
                tracing::error!("Error parsing items JSON: {}", e);
                None
            }
        }
    }

    async fn fetch_plain_text(&self) -> Result<String> {
        let response = self.client.get(&self.feed_url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        Ok(response.text().await?)
    }
}

fn parse_json_array(body: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => Ok(items),
        other => Err(anyhow::anyhow!("Expected JSON array, got {}", json_kind(&other)).into()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
