use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use cronica_catalog::{CatalogItem, Person, SearchResult};
use cronica_core::error::ApiError;
use cronica_core::{Episode, EpisodeKey, ItemKey, MediaType, Season, SmartFilter, WatchlistItem};
use cronica_tracker::{PendingNotification, WatchlistEvent};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(
            tower::ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Watchlist
        .route("/watchlist", get(list_watchlist).post(add_item))
        .route("/watchlist/{media_type}/{id}", get(get_item).delete(remove_item))
        .route("/watchlist/{media_type}/{id}/status", get(item_status))
        .route("/watchlist/{media_type}/{id}/watched", post(toggle_watched))
        .route("/watchlist/{media_type}/{id}/favorite", post(toggle_favorite))
        .route("/watchlist/{media_type}/{id}/pin", post(toggle_pin))
        .route("/watchlist/{media_type}/{id}/archive", post(toggle_archive))
        .route("/watchlist/{media_type}/{id}/notify", post(toggle_notify))
        .route("/watchlist/{media_type}/{id}/refresh", post(refresh_item))
        // Episode progress
        .route("/shows/{id}/episodes", post(mark_episode))
        .route("/shows/{id}/episodes/{season}/{episode}", delete(unmark_episode))
        .route("/shows/{id}/seasons/{season}/watched", post(mark_season))
        .route("/shows/{id}/next", get(next_episode))
        .route("/up-next", get(up_next))
        // Catalog passthrough
        .route("/catalog/search", get(search_catalog))
        .route("/catalog/trending", get(trending))
        .route("/catalog/movie/{id}", get(catalog_movie))
        .route("/catalog/tv/{id}", get(catalog_show))
        .route("/catalog/tv/{id}/season/{season}", get(catalog_season))
        .route("/catalog/person/{id}", get(catalog_person))
        // Reminders and change feed
        .route("/notifications", get(list_notifications))
        .route("/events", get(sse_events))
}

// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(state.tracker.store().pool())
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

fn episode_key(season: i32, episode: i32) -> Result<EpisodeKey, AppError> {
    if season < 0 || episode < 1 {
        return Err(ApiError::BadRequest("season must be >= 0 and episode >= 1".into()).into());
    }
    Ok(EpisodeKey::new(season, episode))
}

fn parse_key(media_type: &str, id: i64) -> Result<ItemKey, AppError> {
    let media_type: MediaType = media_type
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(ItemKey::new(id, media_type))
}

// ---------------------------------------------------------------------------
// Watchlist

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    filter: SmartFilter,
}

async fn list_watchlist(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<WatchlistItem>> {
    let today = chrono::Utc::now().date_naive();
    Json(state.tracker.store().list(query.filter, today).await)
}

#[derive(Deserialize)]
struct AddItemRequest {
    catalog_id: i64,
    media_type: MediaType,
}

async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<AddItemRequest>,
) -> Result<(axum::http::StatusCode, Json<WatchlistItem>), AppError> {
    let key = ItemKey::new(body.catalog_id, body.media_type);
    let item = state.tracker.add_to_watchlist(key).await?;
    Ok((axum::http::StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<WatchlistItem>, AppError> {
    let key = parse_key(&media_type, id)?;
    let item = state
        .tracker
        .store()
        .fetch(key)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("item {key} is not tracked")))?;
    Ok(Json(item))
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

async fn remove_item(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<RemovedResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    let removed = state.tracker.remove_from_watchlist(key).await;
    Ok(Json(RemovedResponse { removed }))
}

#[derive(Serialize)]
struct StatusResponse {
    saved: bool,
    watched: bool,
    favorite: bool,
    pinned: bool,
    archived: bool,
    notify: bool,
}

async fn item_status(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<StatusResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    let store = state.tracker.store();
    Ok(Json(StatusResponse {
        saved: store.is_item_saved(key).await,
        watched: store.is_marked_as_watched(key).await,
        favorite: store.is_favorite(key).await,
        pinned: store.is_item_pinned(key).await,
        archived: store.is_item_archived(key).await,
        notify: store.is_notify_enabled(key).await,
    }))
}

#[derive(Serialize)]
struct ToggleResponse {
    value: bool,
}

fn toggled(key: ItemKey, value: Option<bool>) -> Result<Json<ToggleResponse>, AppError> {
    value
        .map(|value| Json(ToggleResponse { value }))
        .ok_or_else(|| ApiError::NotFound(format!("item {key} is not tracked")).into())
}

async fn toggle_watched(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    toggled(key, state.tracker.store().update_watched(key).await)
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    toggled(key, state.tracker.store().update_favorite(key).await)
}

async fn toggle_pin(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    toggled(key, state.tracker.store().update_pin(key).await)
}

async fn toggle_archive(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    toggled(key, state.tracker.store().update_archive(key).await)
}

async fn toggle_notify(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key = parse_key(&media_type, id)?;
    toggled(key, state.tracker.toggle_notify(key).await)
}

async fn refresh_item(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<Json<WatchlistItem>, AppError> {
    let key = parse_key(&media_type, id)?;
    Ok(Json(state.tracker.refresh_item(key).await?))
}

// ---------------------------------------------------------------------------
// Episode progress

#[derive(Deserialize)]
struct EpisodeRequest {
    season: i32,
    episode: i32,
}

#[derive(Serialize)]
struct UpNextResponse {
    up_next: Option<Episode>,
}

async fn mark_episode(
    State(state): State<AppState>,
    Path(show_id): Path<i64>,
    Json(body): Json<EpisodeRequest>,
) -> Result<Json<UpNextResponse>, AppError> {
    let episode = episode_key(body.season, body.episode)?;
    let up_next = state.tracker.mark_episode_watched(show_id, episode).await?;
    Ok(Json(UpNextResponse { up_next }))
}

async fn unmark_episode(
    State(state): State<AppState>,
    Path((show_id, season, episode)): Path<(i64, i32, i32)>,
) -> Result<Json<RemovedResponse>, AppError> {
    let episode = episode_key(season, episode)?;
    let removed = state.tracker.unmark_episode(show_id, episode).await;
    Ok(Json(RemovedResponse { removed }))
}

async fn mark_season(
    State(state): State<AppState>,
    Path((show_id, season)): Path<(i64, i32)>,
) -> Result<Json<UpNextResponse>, AppError> {
    if season < 0 {
        return Err(ApiError::BadRequest("season must be >= 0".into()).into());
    }
    let up_next = state.tracker.mark_season_watched(show_id, season).await?;
    Ok(Json(UpNextResponse { up_next }))
}

async fn next_episode(
    State(state): State<AppState>,
    Path(show_id): Path<i64>,
    Query(query): Query<EpisodeRequest>,
) -> Result<Json<UpNextResponse>, AppError> {
    let current = episode_key(query.season, query.episode)?;
    let up_next = state
        .tracker
        .progression()
        .fetch_next_episode(current, show_id)
        .await;
    Ok(Json(UpNextResponse { up_next }))
}

async fn up_next(State(state): State<AppState>) -> Json<Vec<WatchlistItem>> {
    Json(state.tracker.store().up_next().await)
}

// ---------------------------------------------------------------------------
// Catalog

#[derive(Deserialize)]
struct SearchQuery {
    query: String,
    page: Option<u32>,
}

async fn search_catalog(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    if q.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()).into());
    }
    let results = state
        .tracker
        .catalog()
        .search(q.query.trim(), q.page.unwrap_or(1))
        .await?;
    Ok(Json(results))
}

#[derive(Deserialize)]
struct TrendingQuery {
    media_type: Option<MediaType>,
}

async fn trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    Ok(Json(state.tracker.catalog().trending(q.media_type).await?))
}

async fn catalog_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogItem>, AppError> {
    Ok(Json(state.tracker.catalog().movie(id).await?))
}

async fn catalog_show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogItem>, AppError> {
    Ok(Json(state.tracker.catalog().show(id).await?))
}

async fn catalog_season(
    State(state): State<AppState>,
    Path((id, season)): Path<(i64, i32)>,
) -> Result<Json<Season>, AppError> {
    Ok(Json(state.tracker.catalog().season(id, season).await?))
}

async fn catalog_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Person>, AppError> {
    Ok(Json(state.tracker.catalog().person(id).await?))
}

// ---------------------------------------------------------------------------
// Reminders and events

async fn list_notifications(State(state): State<AppState>) -> Json<Vec<PendingNotification>> {
    Json(state.tracker.notifications().pending().await)
}

async fn sse_events(
    State(state): State<AppState>,
) -> axum::response::Sse<
    impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;
    use std::time::Duration;

    let mut rx = state.tracker.store().subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(evt) => {
                    let event_type = WatchlistEvent::name(&evt);
                    if let Ok(data) = serde_json::to_string(&evt) {
                        yield Ok(Event::default().event(event_type).data(data));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default()
                        .event("error")
                        .data(format!(r#"{{"lagged":{n}}}"#)));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    axum::response::Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
