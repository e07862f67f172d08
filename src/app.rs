use std::time::Duration;

use crate::config::Config;
use crate::db::{build_dir_uri, build_item_uri, ItemsProvider};
use crate::error::Result;
use crate::feed::{self, Api};
use crate::models::Article;

pub struct App {
    pub provider: ItemsProvider,
    api: Api,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let provider = ItemsProvider::new(&config.db_path);
        let api = Api::new(
            config.feed_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self { provider, api })
    }

    /// Fetch the feed and replace the stored articles. `None` means the
    /// fetch produced no usable data and the stored articles were kept.
    pub async fn refresh(&self) -> Result<Option<usize>> {
        feed::refresh(&self.api, &self.provider).await
    }

    pub async fn articles(&self) -> Result<Vec<Article>> {
        self.provider.query_articles(&build_dir_uri()).await
    }

    pub async fn article(&self, id: i64) -> Result<Option<Article>> {
        let articles = self.provider.query_articles(&build_item_uri(id)).await?;
        Ok(articles.into_iter().next())
    }
}

pub fn format_date(article: &Article) -> String {
    article
        .published_at()
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line of the article list.
pub fn list_line(article: &Article) -> String {
    format!(
        "{:>4}  {:<12}  {} by {}",
        article.id,
        format_date(article),
        article.title,
        article.author
    )
}

pub fn detail(article: &Article) -> String {
    format!(
        "{}\n{} by {}\n\n{}\n\nPhoto: {} (aspect {:.2})",
        article.title,
        format_date(article),
        article.author,
        article.body,
        article.photo_url,
        article.aspect_ratio
    )
}
