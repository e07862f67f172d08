use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::db::contract::items;
use crate::db::ContentValues;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub server_id: Option<String>,
    pub title: String,
    pub author: String,
    pub body: String,
    pub thumb_url: String,
    pub photo_url: String,
    pub aspect_ratio: f64,
    /// Milliseconds since the Unix epoch.
    pub published_date: i64,
}

impl Article {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.published_date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub server_id: Option<String>,
    pub title: String,
    pub author: String,
    pub body: String,
    pub thumb_url: String,
    pub photo_url: String,
    /// `None` leaves the column default in place.
    pub aspect_ratio: Option<f64>,
    pub published_date: i64,
}

impl NewArticle {
    pub fn to_values(&self) -> ContentValues {
        let mut values = ContentValues::new();
        values
            .put(items::SERVER_ID, self.server_id.clone())
            .put(items::TITLE, self.title.clone())
            .put(items::AUTHOR, self.author.clone())
            .put(items::BODY, self.body.clone())
            .put(items::THUMB_URL, self.thumb_url.clone())
            .put(items::PHOTO_URL, self.photo_url.clone())
            .put(items::PUBLISHED_DATE, self.published_date);
        if let Some(ratio) = self.aspect_ratio {
            values.put(items::ASPECT_RATIO, ratio);
        }
        values
    }
}

/// Maps a row selected with `items::PROJECTION`.
pub fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        server_id: row.get(1)?,
        title: row.get(2)?,
        author: row.get(3)?,
        body: row.get(4)?,
        thumb_url: row.get(5)?,
        photo_url: row.get(6)?,
        aspect_ratio: row.get(7)?,
        published_date: row.get(8)?,
    })
}
