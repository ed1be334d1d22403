use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::db::Database;
use crate::error::{BatchFetchError, ReaderError};
use crate::fetcher::Fetcher;
use crate::model::Feed;

/// Keeps the stored set of feeds fresh.
pub struct Reader {
    fetcher: Fetcher,
    db: Arc<Database>,
    settings: Settings,
    refreshing: RwLock<bool>,
}

impl Reader {
    pub fn new(fetcher: Fetcher, db: Arc<Database>, settings: Settings) -> Self {
        Self {
            fetcher,
            db,
            settings,
            refreshing: RwLock::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn is_refreshing(&self) -> bool {
        *self.refreshing.read().await
    }

    /// Returns the stored feeds, refetching them first when storage is empty or
    /// `force_update` is set.
    ///
    /// A refresh targets the stored URLs, or the configured defaults when nothing is
    /// stored. Every source is fetched and saved concurrently and all of them run to
    /// completion. If any source fails the whole call fails with
    /// [`ReaderError::Batch`], although the sources that succeeded have been saved.
    ///
    /// The order of a refreshed list does not follow the order of the URLs.
    pub async fn get_all_feeds(&self, force_update: bool) -> Result<Vec<Feed>, ReaderError> {
        let feeds = self.db.get_all_feeds().await?;

        if !force_update && !feeds.is_empty() {
            return Ok(feeds);
        }

        let urls: Vec<String> = if feeds.is_empty() {
            self.settings.default_feed_urls().to_vec()
        } else {
            feeds.into_iter().map(|feed| feed.source_url).collect()
        };

        info!("Refreshing {} feeds", urls.len());
        let total = urls.len();
        let results = join_all(urls.iter().map(|url| self.fetch_and_save(url))).await;

        let mut refreshed = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(feed) => refreshed.push(feed),
                Err(e) => failures.push(e),
            }
        }

        if !failures.is_empty() {
            let err = BatchFetchError { total, failures };
            error!("Feed refresh failed: {}", err);
            return Err(err.into());
        }

        info!("Feed refresh complete");
        Ok(refreshed)
    }

    /// Fetches and stores a new source.
    pub async fn add_feed(&self, url: &str) -> Result<Feed, ReaderError> {
        self.fetch_and_save(url).await
    }

    /// Re-keys a stored feed from `old_url` to `new_url`.
    ///
    /// Content is fetched from `old_url`; `new_url` itself is never requested. The
    /// old record is swapped for the renamed copy in a single transaction.
    pub async fn edit_feed(&self, old_url: &str, new_url: &str) -> Result<Feed, ReaderError> {
        let old_feed = self.fetch(old_url).await?;
        let new_feed = old_feed.with_source_url(new_url);
        debug!(
            "Moving feed '{}' from {} to {} without fetching the new URL",
            new_feed.title, old_url, new_url
        );

        self.db.replace_feed(old_url, &new_feed).await?;

        Ok(new_feed)
    }

    pub async fn delete_feed(&self, url: &str) -> Result<(), ReaderError> {
        self.db.delete_feed(url).await?;
        info!("Deleted feed {}", url);
        Ok(())
    }

    /// Forced refresh that skips if one is already running.
    pub async fn refresh_all(&self) -> Result<(), ReaderError> {
        {
            let mut refreshing = self.refreshing.write().await;
            if *refreshing {
                info!("Refresh already in progress, skipping");
                return Ok(());
            }
            *refreshing = true;
        }

        let result = self.get_all_feeds(true).await;

        {
            let mut refreshing = self.refreshing.write().await;
            *refreshing = false;
        }

        result.map(|_| ())
    }

    async fn fetch(&self, url: &str) -> Result<Feed, ReaderError> {
        self.fetcher
            .fetch_feed(url, self.settings.is_default(url))
            .await
            .map_err(|source| ReaderError::Fetch {
                url: url.to_string(),
                source,
            })
    }

    async fn fetch_and_save(&self, url: &str) -> Result<Feed, ReaderError> {
        let feed = self.fetch(url).await?;
        self.db.save_feed(&feed).await?;
        info!("Saved {} posts for feed '{}'", feed.posts.len(), feed.title);
        Ok(feed)
    }
}

pub async fn start_background_refresh(reader: Arc<Reader>, interval_minutes: u64) {
    let interval = Duration::from_secs(interval_minutes.max(1) * 60);

    info!("Starting initial feed fetch");
    if let Err(e) = reader.get_all_feeds(false).await {
        error!("Initial feed fetch failed: {}", e);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled feed refresh");
        if let Err(e) = reader.refresh_all().await {
            error!("Scheduled feed refresh failed: {}", e);
        }
    }
}
