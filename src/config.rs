use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::fetcher::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Refresh interval in minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Attempts per source before a fetch is given up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Sources used when nothing has been stored yet
    #[serde(default)]
    pub default_feeds: Vec<String>,
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn settings(&self) -> Settings {
        Settings::new(self.default_feeds.iter().cloned())
    }
}

/// The built-in default sources, handed to the reader at construction.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    default_feed_urls: Vec<String>,
}

impl Settings {
    /// Keeps first-seen order and drops duplicates.
    pub fn new<I: IntoIterator<Item = String>>(urls: I) -> Self {
        let mut default_feed_urls: Vec<String> = Vec::new();
        for url in urls {
            if !default_feed_urls.contains(&url) {
                default_feed_urls.push(url);
            }
        }
        Self { default_feed_urls }
    }

    pub fn default_feed_urls(&self) -> &[String] {
        &self.default_feed_urls
    }

    pub fn is_default(&self, url: &str) -> bool {
        self.default_feed_urls.iter().any(|u| u == url)
    }
}
