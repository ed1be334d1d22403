use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rss_reader::config::Config;
use rss_reader::db::Database;
use rss_reader::fetcher::Fetcher;
use rss_reader::reader::{start_background_refresh, Reader};
use rss_reader::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rss_reader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("RSS_READER_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded {} default feeds from {}",
        config.default_feeds.len(),
        config_path
    );

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:rss_reader.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let db = Arc::new(db);

    let fetcher = Fetcher::new(config.request_timeout(), config.max_attempts)?;
    let reader = Arc::new(Reader::new(fetcher, db.clone(), config.settings()));

    // Start background refresh task
    let bg_reader = reader.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        start_background_refresh(bg_reader, refresh_interval).await;
    });

    let app = routes::router(Arc::new(AppState { db, reader }));

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server starting on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
