use std::collections::HashMap;

use sqlx::{sqlite::SqlitePoolOptions, FromRow, Sqlite, SqlitePool, Transaction};

use crate::model::{Feed, Post};

#[derive(Debug, FromRow)]
struct FeedRow {
    source_url: String,
    title: String,
    link: String,
    description: String,
    image_url: Option<String>,
    is_default: bool,
}

#[derive(Debug, FromRow)]
struct PostRow {
    feed_url: String,
    title: String,
    link: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    published_at: i64,
    creator: Option<String>,
    feed_title: String,
}

impl FeedRow {
    fn into_feed(self, posts: Vec<Post>) -> Feed {
        Feed {
            title: self.title,
            link: self.link,
            description: self.description,
            image_url: self.image_url,
            posts,
            source_url: self.source_url,
            is_default: self.is_default,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            title: row.title,
            link: row.link,
            description: row.description,
            image_url: row.image_url,
            published_at: row.published_at,
            creator: row.creator,
            feed_title: row.feed_title,
        }
    }
}

/// Feed storage keyed by `source_url`.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> sqlx::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                source_url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                description TEXT NOT NULL,
                image_url TEXT,
                is_default INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                feed_url TEXT NOT NULL REFERENCES feeds(source_url),
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                link TEXT,
                description TEXT,
                image_url TEXT,
                published_at INTEGER NOT NULL,
                creator TEXT,
                feed_title TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_feed_position
            ON posts(feed_url, position)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All stored feeds in the order they were first saved, each with its posts.
    pub async fn get_all_feeds(&self) -> sqlx::Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT source_url, title, link, description, image_url, is_default FROM feeds ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let post_rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT feed_url, title, link, description, image_url, published_at, creator, feed_title
            FROM posts
            ORDER BY feed_url, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut posts: HashMap<String, Vec<Post>> = HashMap::new();
        for row in post_rows {
            posts.entry(row.feed_url.clone()).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let feed_posts = posts.remove(&row.source_url).unwrap_or_default();
                row.into_feed(feed_posts)
            })
            .collect())
    }

    pub async fn get_feed(&self, source_url: &str) -> sqlx::Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(
            "SELECT source_url, title, link, description, image_url, is_default FROM feeds WHERE source_url = ?",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT feed_url, title, link, description, image_url, published_at, creator, feed_title
            FROM posts
            WHERE feed_url = ?
            ORDER BY position
            "#,
        )
        .bind(source_url)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Post::from)
        .collect();

        Ok(Some(row.into_feed(posts)))
    }

    /// Inserts `feed`, or replaces the stored feed with the same `source_url`.
    ///
    /// A replaced feed keeps its position in [`get_all_feeds`](Self::get_all_feeds).
    pub async fn save_feed(&self, feed: &Feed) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        write_feed(&mut tx, feed).await?;
        tx.commit().await
    }

    /// Removes the feed stored under `old_url` and saves `feed` in its place, in one
    /// transaction. Either both happen or neither does.
    pub async fn replace_feed(&self, old_url: &str, feed: &Feed) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        remove_feed(&mut tx, old_url).await?;
        write_feed(&mut tx, feed).await?;
        tx.commit().await
    }

    /// Removes a feed and its posts. Unknown URLs are ignored.
    pub async fn delete_feed(&self, source_url: &str) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        remove_feed(&mut tx, source_url).await?;
        tx.commit().await
    }
}

async fn write_feed(tx: &mut Transaction<'_, Sqlite>, feed: &Feed) -> sqlx::Result<()> {
    // Writing first takes the write lock up front, so concurrent savers wait on
    // the busy timeout instead of failing on a lock upgrade.
    sqlx::query("DELETE FROM posts WHERE feed_url = ?")
        .bind(&feed.source_url)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO feeds (source_url, title, link, description, image_url, is_default)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(source_url) DO UPDATE SET
            title = excluded.title,
            link = excluded.link,
            description = excluded.description,
            image_url = excluded.image_url,
            is_default = excluded.is_default
        "#,
    )
    .bind(&feed.source_url)
    .bind(&feed.title)
    .bind(&feed.link)
    .bind(&feed.description)
    .bind(&feed.image_url)
    .bind(feed.is_default)
    .execute(&mut **tx)
    .await?;

    for (position, post) in feed.posts.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO posts
                (feed_url, position, title, link, description, image_url, published_at, creator, feed_title)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&feed.source_url)
        .bind(position as i64)
        .bind(&post.title)
        .bind(&post.link)
        .bind(&post.description)
        .bind(&post.image_url)
        .bind(post.published_at)
        .bind(&post.creator)
        .bind(&post.feed_title)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn remove_feed(tx: &mut Transaction<'_, Sqlite>, source_url: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM posts WHERE feed_url = ?")
        .bind(source_url)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM feeds WHERE source_url = ?")
        .bind(source_url)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn create_post(title: &str, feed_title: &str, published_at: i64) -> Post {
        Post {
            title: title.to_string(),
            link: Some(format!("https://example.com/{}", title)),
            description: Some(format!("About {}", title)),
            image_url: None,
            published_at,
            creator: None,
            feed_title: feed_title.to_string(),
        }
    }

    fn create_feed(source_url: &str, title: &str, post_count: usize) -> Feed {
        Feed {
            title: title.to_string(),
            link: "https://example.com".to_string(),
            description: format!("{} description", title),
            image_url: Some("https://example.com/logo.png".to_string()),
            posts: (0..post_count)
                .map(|i| create_post(&format!("post-{}", i), title, 1_700_000_000_000 + i as i64))
                .collect(),
            source_url: source_url.to_string(),
            is_default: false,
        }
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_database_creation() {
            let db = Database::new("sqlite::memory:").await;
            assert!(db.is_ok());
        }

        #[tokio::test]
        async fn test_database_initialization() {
            let db = create_test_db().await;
            let feeds = db.get_all_feeds().await.unwrap();
            assert!(feeds.is_empty());
        }

        #[tokio::test]
        async fn test_double_initialization_is_safe() {
            let db = create_test_db().await;
            let result = db.initialize().await;
            assert!(result.is_ok());
        }
    }

    mod save_feed_tests {
        use super::*;

        #[tokio::test]
        async fn test_save_and_read_back() {
            let db = create_test_db().await;
            let feed = create_feed("https://a.example.com/rss", "A", 3);

            db.save_feed(&feed).await.unwrap();

            let feeds = db.get_all_feeds().await.unwrap();
            assert_eq!(feeds, vec![feed]);
        }

        #[tokio::test]
        async fn test_posts_keep_their_order() {
            let db = create_test_db().await;
            let mut feed = create_feed("https://a.example.com/rss", "A", 0);
            feed.posts = vec![
                create_post("zulu", "A", 3),
                create_post("alpha", "A", 1),
                create_post("mike", "A", 2),
            ];

            db.save_feed(&feed).await.unwrap();

            let stored = db.get_feed(&feed.source_url).await.unwrap().unwrap();
            let titles: Vec<_> = stored.posts.iter().map(|p| p.title.as_str()).collect();
            assert_eq!(titles, vec!["zulu", "alpha", "mike"]);
        }

        #[tokio::test]
        async fn test_save_overwrites_by_source_url() {
            let db = create_test_db().await;
            db.save_feed(&create_feed("https://a.example.com/rss", "Old", 5))
                .await
                .unwrap();

            let updated = create_feed("https://a.example.com/rss", "New", 2);
            db.save_feed(&updated).await.unwrap();

            let feeds = db.get_all_feeds().await.unwrap();
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].title, "New");
            assert_eq!(feeds[0].posts.len(), 2);
        }

        #[tokio::test]
        async fn test_overwrite_keeps_list_position() {
            let db = create_test_db().await;
            db.save_feed(&create_feed("https://a.example.com/rss", "A", 1))
                .await
                .unwrap();
            db.save_feed(&create_feed("https://b.example.com/rss", "B", 1))
                .await
                .unwrap();
            db.save_feed(&create_feed("https://a.example.com/rss", "A2", 1))
                .await
                .unwrap();

            let feeds = db.get_all_feeds().await.unwrap();
            let titles: Vec<_> = feeds.iter().map(|f| f.title.as_str()).collect();
            assert_eq!(titles, vec!["A2", "B"]);
        }

        #[tokio::test]
        async fn test_posts_stay_with_their_feed() {
            let db = create_test_db().await;
            db.save_feed(&create_feed("https://a.example.com/rss", "A", 2))
                .await
                .unwrap();
            db.save_feed(&create_feed("https://b.example.com/rss", "B", 4))
                .await
                .unwrap();

            let feeds = db.get_all_feeds().await.unwrap();
            assert_eq!(feeds[0].posts.len(), 2);
            assert!(feeds[0].posts.iter().all(|p| p.feed_title == "A"));
            assert_eq!(feeds[1].posts.len(), 4);
            assert!(feeds[1].posts.iter().all(|p| p.feed_title == "B"));
        }

        #[tokio::test]
        async fn test_optional_fields_round_trip_as_none() {
            let db = create_test_db().await;
            let mut feed = create_feed("https://a.example.com/rss", "A", 1);
            feed.image_url = None;
            feed.is_default = true;
            feed.posts[0].link = None;
            feed.posts[0].description = None;

            db.save_feed(&feed).await.unwrap();

            let stored = db.get_feed(&feed.source_url).await.unwrap().unwrap();
            assert_eq!(stored, feed);
        }
    }

    mod get_feed_tests {
        use super::*;

        #[tokio::test]
        async fn test_get_nonexistent_feed() {
            let db = create_test_db().await;
            let feed = db.get_feed("https://missing.example.com/rss").await.unwrap();
            assert!(feed.is_none());
        }
    }

    mod replace_feed_tests {
        use super::*;

        #[tokio::test]
        async fn test_replace_moves_feed_to_new_key() {
            let db = create_test_db().await;
            db.save_feed(&create_feed("https://old.example.com/rss", "A", 2))
                .await
                .unwrap();

            let moved = create_feed("https://new.example.com/rss", "A", 2);
            db.replace_feed("https://old.example.com/rss", &moved)
                .await
                .unwrap();

            assert_eq!(db.get_all_feeds().await.unwrap(), vec![moved]);
            assert!(db
                .get_feed("https://old.example.com/rss")
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn test_failed_replace_keeps_old_feed() {
            let db = create_test_db().await;
            let old = create_feed("https://old.example.com/rss", "A", 3);
            db.save_feed(&old).await.unwrap();

            sqlx::query(
                r#"
                CREATE TRIGGER reject_new_url BEFORE INSERT ON feeds
                WHEN NEW.source_url = 'https://new.example.com/rss'
                BEGIN SELECT RAISE(ABORT, 'rejected'); END
                "#,
            )
            .execute(&db.pool)
            .await
            .unwrap();

            let moved = create_feed("https://new.example.com/rss", "A", 3);
            let result = db.replace_feed("https://old.example.com/rss", &moved).await;

            assert!(result.is_err());
            assert_eq!(db.get_all_feeds().await.unwrap(), vec![old]);
        }
    }

    mod delete_feed_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_removes_feed_and_posts() {
            let db = create_test_db().await;
            db.save_feed(&create_feed("https://a.example.com/rss", "A", 3))
                .await
                .unwrap();
            db.save_feed(&create_feed("https://b.example.com/rss", "B", 1))
                .await
                .unwrap();

            db.delete_feed("https://a.example.com/rss").await.unwrap();

            let feeds = db.get_all_feeds().await.unwrap();
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].source_url, "https://b.example.com/rss");

            // Re-adding starts from a clean slate
            db.save_feed(&create_feed("https://a.example.com/rss", "A", 1))
                .await
                .unwrap();
            let stored = db.get_feed("https://a.example.com/rss").await.unwrap().unwrap();
            assert_eq!(stored.posts.len(), 1);
        }

        #[tokio::test]
        async fn test_delete_unknown_feed_is_ok() {
            let db = create_test_db().await;
            let result = db.delete_feed("https://missing.example.com/rss").await;
            assert!(result.is_ok());
        }
    }
}
