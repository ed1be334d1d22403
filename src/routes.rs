use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::db::Database;
use crate::error::ReaderError;
use crate::reader::Reader;

pub struct AppState {
    pub db: Arc<Database>,
    pub reader: Arc<Reader>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/feeds",
            get(list_feeds)
                .post(add_feed)
                .put(edit_feed)
                .delete(delete_feed),
        )
        .route("/feed", get(get_feed))
        .route("/refresh", post(refresh))
        .route("/refresh/status", get(refresh_status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub enum AppError {
    Reader(ReaderError),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Reader(e) => {
                let status = match e {
                    ReaderError::Fetch { .. } | ReaderError::Batch(_) => StatusCode::BAD_GATEWAY,
                    ReaderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::NotFound(url) => (StatusCode::NOT_FOUND, format!("Feed not found: {}", url)),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ReaderError> for AppError {
    fn from(err: ReaderError) -> Self {
        AppError::Reader(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Reader(err.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AddFeedRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct EditFeedRequest {
    pub old_url: String,
    pub new_url: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshStatus {
    pub refreshing: bool,
}

pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let feeds = state.reader.get_all_feeds(query.force).await?;
    Ok(Json(feeds))
}

pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<impl IntoResponse, AppError> {
    let feed = state
        .db
        .get_feed(&query.url)
        .await?
        .ok_or(AppError::NotFound(query.url))?;
    Ok(Json(feed))
}

pub async fn add_feed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddFeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feed = state.reader.add_feed(&request.url).await?;
    Ok((StatusCode::CREATED, Json(feed)))
}

pub async fn edit_feed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditFeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feed = state
        .reader
        .edit_feed(&request.old_url, &request.new_url)
        .await?;
    Ok(Json(feed))
}

pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.reader.delete_feed(&query.url).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reader = state.reader.clone();
    tokio::spawn(async move {
        if let Err(e) = reader.refresh_all().await {
            error!("Manual refresh failed: {}", e);
        }
    });

    (StatusCode::ACCEPTED, Json(RefreshStatus { refreshing: true }))
}

pub async fn refresh_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let refreshing = state.reader.is_refreshing().await;
    Json(RefreshStatus { refreshing })
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
