use serde::{Deserialize, Serialize};

/// One syndication source, fully rebuilt on every fetch.
///
/// `source_url` is the identity key: storage and equality are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Posts in document order.
    pub posts: Vec<Post>,
    pub source_url: String,
    /// True when `source_url` belongs to the configured default set.
    pub is_default: bool,
}

impl Feed {
    /// Returns a copy of this feed keyed by `source_url`.
    pub fn with_source_url(&self, source_url: &str) -> Feed {
        Feed {
            source_url: source_url.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Falls back to the owning feed's title when the item has none.
    pub title: String,
    pub link: Option<String>,
    /// Already sanitized.
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Epoch milliseconds.
    pub published_at: i64,
    pub creator: Option<String>,
    pub feed_title: String,
}
