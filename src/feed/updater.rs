use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::db::{build_dir_uri, ItemsProvider};
use crate::error::{AppError, Result};
use crate::models::NewArticle;

use super::Api;

/// One element of the feed array.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    author: String,
    body: String,
    #[serde(rename = "thumbURL", alias = "thumb")]
    thumb_url: String,
    #[serde(rename = "photoURL", alias = "photo")]
    photo_url: String,
    #[serde(default)]
    aspect_ratio: Option<f64>,
    #[serde(default, rename = "date", alias = "published_date")]
    date: Option<FeedDate>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedDate {
    Millis(i64),
    Text(String),
}

impl FeedDate {
    fn to_millis(&self) -> Result<i64> {
        match self {
            FeedDate::Millis(millis) => Ok(*millis),
            FeedDate::Text(text) => {
                let parsed = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| anyhow::anyhow!("Invalid published date '{}': {}", text, e))?;
                Ok(parsed.timestamp_millis())
            }
        }
    }
}

/// Convert one feed element into a row.
pub fn article_from_json(value: &Value) -> Result<NewArticle> {
    let entry = FeedEntry::deserialize(value)?;

    let server_id = entry.id.and_then(|id| match id {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    });
    let published_date = match &entry.date {
        Some(date) => date.to_millis()?,
        None => 0,
    };

    Ok(NewArticle {
        server_id,
        title: entry.title,
        author: entry.author,
        body: entry.body,
        thumb_url: entry.thumb_url,
        photo_url: entry.photo_url,
        aspect_ratio: entry.aspect_ratio,
        published_date,
    })
}

/// Convert every element of the feed. The first element that does not
/// convert fails the whole batch.
pub fn articles_from_json(items: &[Value]) -> Result<Vec<NewArticle>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            article_from_json(item)
                .map_err(|e| AppError::from(anyhow::anyhow!("Invalid feed item {}: {}", index, e)))
        })
        .collect()
}

/// Fetch the feed and replace the stored articles with it.
///
/// Returns `Ok(None)` when the fetch produced no data or the feed held an
/// element that could not be converted; the stored articles are left as
/// they were.
pub async fn refresh(api: &Api, provider: &ItemsProvider) -> Result<Option<usize>> {
    let Some(items) = api.fetch_json_array().await else {
        tracing::warn!("No data from {}, keeping stored articles", api.feed_url());
        return Ok(None);
    };

    let articles = match articles_from_json(&items) {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!("Error parsing items JSON: {}, keeping stored articles", e);
            return Ok(None);
        }
    };

    let rows = articles.iter().map(NewArticle::to_values).collect();
    let count = provider.bulk_insert(&build_dir_uri(), rows).await?;

    tracing::info!("Stored {} articles", count);
    Ok(Some(count))
}
