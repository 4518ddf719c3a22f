use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::NaiveDate;
use cronica_catalog::Person;
use cronica_server::routes::build_router;
use cronica_server::state::AppState;
use cronica_tracker::testing::{self, FakeCatalog};
use cronica_tracker::Tracker;
use serde_json::{json, Value};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn catalog() -> FakeCatalog {
    FakeCatalog::new()
        .with_item(testing::movie(550, "Fight Club", Some(date(1999, 10, 15))))
        .with_item(testing::movie(777, "Far Future", Some(date(2099, 1, 1))))
        .with_item(testing::show(1399, "Game of Thrones", Some(date(2011, 4, 17))))
        .with_season(testing::season(1399, 1, 3, Some(date(2011, 4, 17))))
        .with_season(testing::season(1399, 2, 3, Some(date(2012, 4, 1))))
        .with_person(Person {
            id: 287,
            name: "Brad Pitt".to_string(),
            biography: None,
            known_for_department: Some("Acting".to_string()),
            birthday: None,
            profile_url: None,
            credits: vec![],
        })
}

/// Create a test server with an in-memory SQLite database and a fake catalog.
async fn test_app() -> TestServer {
    let pool = cronica_db::connect(":memory:").await.unwrap();
    cronica_db::migrate::run(&pool).await.unwrap();

    let tracker = Tracker::new(pool, Arc::new(catalog()));
    let app = build_router(AppState::new(tracker));
    TestServer::new(app).unwrap()
}

async fn add(server: &TestServer, media_type: &str, id: i64) -> Value {
    let resp = server
        .post("/api/v1/watchlist")
        .json(&json!({ "media_type": media_type, "catalog_id": id }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = test_app().await;
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn add_fetch_and_delete_item() {
    let server = test_app().await;

    let body = add(&server, "movie", 550).await;
    assert_eq!(body["title"], "Fight Club");
    assert_eq!(body["notify"], true);
    assert_eq!(body["release_date"], "1999-10-15");

    let resp = server.get("/api/v1/watchlist/movie/550").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["key"]["catalog_id"], 550);

    let resp = server.delete("/api/v1/watchlist/movie/550").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["removed"], true);

    server
        .get("/api/v1/watchlist/movie/550")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Deleting again is a no-op, not an error.
    let resp = server.delete("/api/v1/watchlist/movie/550").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["removed"], false);
}

#[tokio::test]
async fn adding_twice_keeps_one_record_and_flags() {
    let server = test_app().await;
    add(&server, "movie", 550).await;

    server
        .post("/api/v1/watchlist/movie/550/favorite")
        .await
        .assert_status_ok();
    add(&server, "movie", 550).await;

    let resp = server.get("/api/v1/watchlist").await;
    resp.assert_status_ok();
    let items: Vec<Value> = resp.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["favorite"], true);
}

#[tokio::test]
async fn toggles_flip_and_report_status() {
    let server = test_app().await;
    add(&server, "movie", 550).await;

    let resp = server.post("/api/v1/watchlist/movie/550/watched").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["value"], true);

    let resp = server.post("/api/v1/watchlist/movie/550/pin").await;
    let body: Value = resp.json();
    assert_eq!(body["value"], true);

    let resp = server.post("/api/v1/watchlist/movie/550/watched").await;
    let body: Value = resp.json();
    assert_eq!(body["value"], false);

    let resp = server.get("/api/v1/watchlist/movie/550/status").await;
    resp.assert_status_ok();
    let status: Value = resp.json();
    assert_eq!(status["saved"], true);
    assert_eq!(status["watched"], false);
    assert_eq!(status["pinned"], true);
    assert_eq!(status["archived"], false);
}

#[tokio::test]
async fn toggle_on_untracked_item_is_not_found() {
    let server = test_app().await;
    let resp = server.post("/api/v1/watchlist/tv/1399/archive").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn unknown_media_type_is_bad_request() {
    let server = test_app().await;
    let resp = server.get("/api/v1/watchlist/podcast/1").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn filtered_listing() {
    let server = test_app().await;
    add(&server, "movie", 550).await;
    add(&server, "movie", 777).await;
    server.post("/api/v1/watchlist/movie/550/favorite").await;

    let items: Vec<Value> = server
        .get("/api/v1/watchlist")
        .add_query_param("filter", "favorites")
        .await
        .json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"]["catalog_id"], 550);

    let items: Vec<Value> = server
        .get("/api/v1/watchlist")
        .add_query_param("filter", "upcoming")
        .await
        .json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"]["catalog_id"], 777);
}

#[tokio::test]
async fn future_release_schedules_and_cancels_notification() {
    let server = test_app().await;
    add(&server, "movie", 777).await;
    add(&server, "movie", 550).await;

    let pending: Vec<Value> = server.get("/api/v1/notifications").await.json();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["identifier"], "777@0");

    let resp = server.post("/api/v1/watchlist/movie/777/notify").await;
    let body: Value = resp.json();
    assert_eq!(body["value"], false);
    let pending: Vec<Value> = server.get("/api/v1/notifications").await.json();
    assert!(pending.is_empty());

    server.post("/api/v1/watchlist/movie/777/notify").await;
    server.delete("/api/v1/watchlist/movie/777").await;
    let pending: Vec<Value> = server.get("/api/v1/notifications").await.json();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn marking_episodes_moves_up_next() {
    let server = test_app().await;

    // The show is tracked implicitly by the first episode.
    let resp = server
        .post("/api/v1/shows/1399/episodes")
        .json(&json!({ "season": 1, "episode": 1 }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["up_next"]["season_number"], 1);
    assert_eq!(body["up_next"]["episode_number"], 2);

    let resp = server
        .post("/api/v1/shows/1399/episodes")
        .json(&json!({ "season": 1, "episode": 3 }))
        .await;
    let body: Value = resp.json();
    assert_eq!(body["up_next"]["season_number"], 2);
    assert_eq!(body["up_next"]["episode_number"], 1);

    let up_next: Vec<Value> = server.get("/api/v1/up-next").await.json();
    assert_eq!(up_next.len(), 1);
    assert_eq!(up_next[0]["key"]["catalog_id"], 1399);

    let item: Value = server.get("/api/v1/watchlist/tv/1399").await.json();
    assert_eq!(item["watched_episodes"].as_array().unwrap().len(), 2);

    let resp = server.delete("/api/v1/shows/1399/episodes/1/3").await;
    let body: Value = resp.json();
    assert_eq!(body["removed"], true);
    let item: Value = server.get("/api/v1/watchlist/tv/1399").await.json();
    assert_eq!(item["watched_episodes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn marking_a_whole_season() {
    let server = test_app().await;

    let resp = server.post("/api/v1/shows/1399/seasons/2/watched").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert!(body["up_next"].is_null());

    let item: Value = server.get("/api/v1/watchlist/tv/1399").await.json();
    assert_eq!(item["watched_episodes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn next_episode_lookup() {
    let server = test_app().await;
    let body: Value = server
        .get("/api/v1/shows/1399/next")
        .add_query_param("season", 1)
        .add_query_param("episode", 2)
        .await
        .json();
    assert_eq!(body["up_next"]["episode_number"], 3);

    let body: Value = server
        .get("/api/v1/shows/1399/next")
        .add_query_param("season", 2)
        .add_query_param("episode", 3)
        .await
        .json();
    assert!(body["up_next"].is_null());
}

#[tokio::test]
async fn invalid_episode_number_is_bad_request() {
    let server = test_app().await;
    server
        .post("/api/v1/shows/1399/episodes")
        .json(&json!({ "season": 1, "episode": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn episode_routes_share_bounds_checks() {
    let server = test_app().await;
    server
        .delete("/api/v1/shows/1399/episodes/-1/1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/v1/shows/1399/next")
        .add_query_param("season", 1)
        .add_query_param("episode", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/api/v1/shows/1399/seasons/-2/watched")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn largest_episode_number_is_handled() {
    let server = test_app().await;

    let body: Value = server
        .get("/api/v1/shows/1399/next")
        .add_query_param("season", 1)
        .add_query_param("episode", i32::MAX)
        .await
        .json();
    assert!(body["up_next"].is_null());

    let resp = server
        .post("/api/v1/shows/1399/episodes")
        .json(&json!({ "season": 1, "episode": i32::MAX }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert!(body["up_next"].is_null());
}

#[tokio::test]
async fn catalog_passthrough() {
    let server = test_app().await;

    let results: Vec<Value> = server
        .get("/api/v1/catalog/search")
        .add_query_param("query", "fight")
        .await
        .json();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], 550);

    let trending: Vec<Value> = server
        .get("/api/v1/catalog/trending")
        .add_query_param("media_type", "tv")
        .await
        .json();
    assert_eq!(trending.len(), 1);

    let show: Value = server.get("/api/v1/catalog/tv/1399").await.json();
    assert_eq!(show["title"], "Game of Thrones");

    let season: Value = server.get("/api/v1/catalog/tv/1399/season/1").await.json();
    assert_eq!(season["episodes"].as_array().unwrap().len(), 3);

    let person: Value = server.get("/api/v1/catalog/person/287").await.json();
    assert_eq!(person["name"], "Brad Pitt");
}

#[tokio::test]
async fn unknown_catalog_entries_are_not_found() {
    let server = test_app().await;
    server
        .get("/api/v1/catalog/movie/1")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let resp = server
        .post("/api/v1/watchlist")
        .json(&json!({ "media_type": "movie", "catalog_id": 1 }))
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let items: Vec<Value> = server.get("/api/v1/watchlist").await.json();
    assert!(items.is_empty());
}

#[tokio::test]
async fn empty_search_is_bad_request() {
    let server = test_app().await;
    server
        .get("/api/v1/catalog/search")
        .add_query_param("query", "  ")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_requires_tracked_item() {
    let server = test_app().await;
    server
        .post("/api/v1/watchlist/movie/550/refresh")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    add(&server, "movie", 550).await;
    let resp = server.post("/api/v1/watchlist/movie/550/refresh").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["title"], "Fight Club");
}
