//! TMDB (The Movie Database) catalog client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use chrono::NaiveDate;
use cronica_core::{Episode, MediaType, Season};
use tracing::debug;

use crate::provider::CatalogProvider;
use crate::{CatalogError, CatalogItem, Person, SearchResult};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

pub struct TmdbClient {
    api_key: String,
    language: String,
    base_url: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            language: "en-US".to_string(),
            base_url: BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Point the client at another host (a caching proxy, or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, CatalogError> {
        let mut all_params = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(CatalogError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| CatalogError::Decode(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn movie(&self, id: i64) -> Result<CatalogItem, CatalogError> {
        let data = self.get_json(&format!("/movie/{id}"), &[]).await?;
        parse_movie(&data)
    }

    async fn show(&self, id: i64) -> Result<CatalogItem, CatalogError> {
        let data = self.get_json(&format!("/tv/{id}"), &[]).await?;
        parse_show(&data)
    }

    async fn season(&self, show_id: i64, season_number: i32) -> Result<Season, CatalogError> {
        let data = self
            .get_json(&format!("/tv/{show_id}/season/{season_number}"), &[])
            .await?;
        Ok(parse_season(&data, show_id, season_number))
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, CatalogError> {
        let page = page.max(1).to_string();
        let data = self
            .get_json(
                "/search/multi",
                &[
                    ("query", query),
                    ("page", page.as_str()),
                    ("include_adult", "false"),
                ],
            )
            .await?;
        Ok(parse_results(&data, None))
    }

    async fn trending(
        &self,
        media_type: Option<MediaType>,
    ) -> Result<Vec<SearchResult>, CatalogError> {
        let scope = media_type.map(|m| m.as_str()).unwrap_or("all");
        let data = self
            .get_json(&format!("/trending/{scope}/week"), &[])
            .await?;
        Ok(parse_results(&data, media_type))
    }

    async fn person(&self, id: i64) -> Result<Person, CatalogError> {
        let data = self
            .get_json(
                &format!("/person/{id}"),
                &[("append_to_response", "combined_credits")],
            )
            .await?;
        parse_person(&data)
    }
}

fn string(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// TMDB sends `""` or `null` for unknown dates.
fn date(value: &serde_json::Value) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn image(value: &serde_json::Value, size: &str) -> Option<String> {
    value.as_str().map(|p| format!("{IMAGE_BASE}/{size}{p}"))
}

fn required_id(data: &serde_json::Value) -> Result<i64, CatalogError> {
    data["id"]
        .as_i64()
        .ok_or_else(|| CatalogError::Decode("missing id".into()))
}

fn genres(data: &serde_json::Value) -> Vec<String> {
    data["genres"]
        .as_array()
        .map(|gs| {
            gs.iter()
                .filter_map(|g| g["name"].as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_movie(data: &serde_json::Value) -> Result<CatalogItem, CatalogError> {
    Ok(CatalogItem {
        id: required_id(data)?,
        media_type: MediaType::Movie,
        title: string(&data["title"]).unwrap_or_else(|| "Unknown".to_string()),
        overview: string(&data["overview"]),
        poster_url: image(&data["poster_path"], "w500"),
        backdrop_url: image(&data["backdrop_path"], "original"),
        release_date: date(&data["release_date"]),
        genres: genres(data),
        number_of_seasons: None,
        next_episode_to_air: None,
        last_episode_to_air: None,
    })
}

fn parse_show(data: &serde_json::Value) -> Result<CatalogItem, CatalogError> {
    let id = required_id(data)?;
    let next_episode = data
        .get("next_episode_to_air")
        .filter(|v| v.is_object())
        .and_then(|v| parse_episode(v, id));
    let last_episode = data
        .get("last_episode_to_air")
        .filter(|v| v.is_object())
        .and_then(|v| parse_episode(v, id));

    let release_date = next_episode
        .as_ref()
        .and_then(|e| e.air_date)
        .or_else(|| date(&data["first_air_date"]));

    Ok(CatalogItem {
        id,
        media_type: MediaType::TvShow,
        title: string(&data["name"]).unwrap_or_else(|| "Unknown".to_string()),
        overview: string(&data["overview"]),
        poster_url: image(&data["poster_path"], "w500"),
        backdrop_url: image(&data["backdrop_path"], "original"),
        release_date,
        genres: genres(data),
        number_of_seasons: data["number_of_seasons"].as_i64().map(|n| n as i32),
        next_episode_to_air: next_episode,
        last_episode_to_air: last_episode,
    })
}

fn parse_episode(ep: &serde_json::Value, show_id: i64) -> Option<Episode> {
    Some(Episode {
        id: ep["id"].as_i64()?,
        show_id,
        season_number: ep["season_number"].as_i64()? as i32,
        episode_number: ep["episode_number"].as_i64()? as i32,
        name: string(&ep["name"]),
        overview: string(&ep["overview"]),
        air_date: date(&ep["air_date"]),
        still_url: image(&ep["still_path"], "w300"),
    })
}

fn parse_season(data: &serde_json::Value, show_id: i64, season_number: i32) -> Season {
    let mut episodes: Vec<Episode> = data["episodes"]
        .as_array()
        .map(|eps| eps.iter().filter_map(|ep| parse_episode(ep, show_id)).collect())
        .unwrap_or_default();
    episodes.sort_by_key(|e| e.episode_number);

    Season {
        show_id,
        season_number: data["season_number"]
            .as_i64()
            .map(|n| n as i32)
            .unwrap_or(season_number),
        name: string(&data["name"]),
        episodes,
    }
}

/// Parse a `results` array from search/trending. Entries whose media type is
/// not a movie or show (people) are dropped. `fallback` covers endpoints that
/// omit `media_type` on each entry.
fn parse_results(data: &serde_json::Value, fallback: Option<MediaType>) -> Vec<SearchResult> {
    data["results"]
        .as_array()
        .map(|rs| rs.iter().filter_map(|r| parse_result(r, fallback)).collect())
        .unwrap_or_default()
}

fn parse_result(r: &serde_json::Value, fallback: Option<MediaType>) -> Option<SearchResult> {
    let media_type = match r["media_type"].as_str() {
        Some(kind) => kind.parse().ok()?,
        None => fallback?,
    };
    let (title, released) = match media_type {
        MediaType::Movie => (&r["title"], &r["release_date"]),
        MediaType::TvShow => (&r["name"], &r["first_air_date"]),
    };

    Some(SearchResult {
        id: r["id"].as_i64()?,
        media_type,
        title: string(title).unwrap_or_else(|| "Unknown".to_string()),
        overview: string(&r["overview"]),
        poster_url: image(&r["poster_path"], "w500"),
        release_date: date(released),
    })
}

fn parse_person(data: &serde_json::Value) -> Result<Person, CatalogError> {
    let credits = data
        .get("combined_credits")
        .map(|c| {
            let mut all = Vec::new();
            for list in ["cast", "crew"] {
                if let Some(entries) = c[list].as_array() {
                    for entry in entries {
                        if let Some(result) = parse_result(entry, None) {
                            if !all.iter().any(|r: &SearchResult| {
                                r.id == result.id && r.media_type == result.media_type
                            }) {
                                all.push(result);
                            }
                        }
                    }
                }
            }
            all
        })
        .unwrap_or_default();

    Ok(Person {
        id: required_id(data)?,
        name: string(&data["name"]).unwrap_or_else(|| "Unknown".to_string()),
        biography: string(&data["biography"]),
        known_for_department: string(&data["known_for_department"]),
        birthday: date(&data["birthday"]),
        profile_url: image(&data["profile_path"], "w185"),
        credits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_movie_from_json() {
        let json = serde_json::json!({
            "id": 27205,
            "title": "Inception",
            "overview": "A thief who steals corporate secrets...",
            "release_date": "2010-07-16",
            "poster_path": "/poster.jpg",
            "backdrop_path": "/backdrop.jpg",
            "genres": [
                { "id": 28, "name": "Action" },
                { "id": 878, "name": "Science Fiction" }
            ]
        });

        let item = parse_movie(&json).unwrap();
        assert_eq!(item.id, 27205);
        assert_eq!(item.media_type, MediaType::Movie);
        assert_eq!(item.title, "Inception");
        assert_eq!(item.release_date, NaiveDate::from_ymd_opt(2010, 7, 16));
        assert_eq!(item.genres.len(), 2);
        assert!(item.poster_url.as_ref().unwrap().ends_with("/w500/poster.jpg"));
    }

    #[test]
    fn movie_without_id_is_a_decode_error() {
        let json = serde_json::json!({ "title": "Nameless" });
        assert!(matches!(parse_movie(&json), Err(CatalogError::Decode(_))));
    }

    #[test]
    fn show_release_date_prefers_next_episode() {
        let json = serde_json::json!({
            "id": 1399,
            "name": "Game of Thrones",
            "first_air_date": "2011-04-17",
            "number_of_seasons": 8,
            "next_episode_to_air": {
                "id": 63056,
                "season_number": 9,
                "episode_number": 1,
                "name": "Winter Again",
                "air_date": "2030-04-14"
            },
            "last_episode_to_air": {
                "id": 1551830,
                "season_number": 8,
                "episode_number": 6,
                "air_date": "2019-05-19",
                "still_path": null
            }
        });

        let show = parse_show(&json).unwrap();
        assert_eq!(show.media_type, MediaType::TvShow);
        assert_eq!(show.number_of_seasons, Some(8));
        assert_eq!(show.release_date, NaiveDate::from_ymd_opt(2030, 4, 14));
        let last = show.last_episode_to_air.unwrap();
        assert_eq!((last.season_number, last.episode_number), (8, 6));
        assert_eq!(last.show_id, 1399);
        assert!(last.still_url.is_none());
    }

    #[test]
    fn ended_show_falls_back_to_first_air_date() {
        let json = serde_json::json!({
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "next_episode_to_air": null
        });

        let show = parse_show(&json).unwrap();
        assert!(show.next_episode_to_air.is_none());
        assert_eq!(show.release_date, NaiveDate::from_ymd_opt(2008, 1, 20));
    }

    #[test]
    fn parse_season_sorts_and_tolerates_blank_dates() {
        let json = serde_json::json!({
            "season_number": 2,
            "name": "Season 2",
            "episodes": [
                { "id": 12, "season_number": 2, "episode_number": 2, "air_date": "" },
                { "id": 11, "season_number": 2, "episode_number": 1, "air_date": "2020-01-01", "name": "Opening" },
                { "name": "broken entry without numbers" }
            ]
        });

        let season = parse_season(&json, 100, 2);
        assert_eq!(season.show_id, 100);
        assert_eq!(season.episodes.len(), 2);
        assert_eq!(season.episodes[0].episode_number, 1);
        assert_eq!(season.episodes[0].name.as_deref(), Some("Opening"));
        assert!(season.episodes[1].air_date.is_none());
    }

    #[test]
    fn search_results_drop_people() {
        let json = serde_json::json!({
            "results": [
                { "id": 1, "media_type": "movie", "title": "Alien", "release_date": "1979-05-25" },
                { "id": 2, "media_type": "person", "name": "Sigourney Weaver" },
                { "id": 3, "media_type": "tv", "name": "Alien: Earth", "first_air_date": "" }
            ]
        });

        let results = parse_results(&json, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Alien");
        assert_eq!(results[1].media_type, MediaType::TvShow);
        assert!(results[1].release_date.is_none());
    }

    #[test]
    fn trending_uses_fallback_media_type() {
        let json = serde_json::json!({
            "results": [ { "id": 7, "name": "Shogun" } ]
        });
        let results = parse_results(&json, Some(MediaType::TvShow));
        assert_eq!(results[0].title, "Shogun");
        assert_eq!(results[0].media_type, MediaType::TvShow);
    }

    #[test]
    fn person_credits_are_deduplicated() {
        let json = serde_json::json!({
            "id": 525,
            "name": "Christopher Nolan",
            "known_for_department": "Directing",
            "birthday": "1970-07-30",
            "combined_credits": {
                "cast": [],
                "crew": [
                    { "id": 27205, "media_type": "movie", "title": "Inception", "job": "Director" },
                    { "id": 27205, "media_type": "movie", "title": "Inception", "job": "Writer" }
                ]
            }
        });

        let person = parse_person(&json).unwrap();
        assert_eq!(person.name, "Christopher Nolan");
        assert_eq!(person.birthday, NaiveDate::from_ymd_opt(1970, 7, 30));
        assert_eq!(person.credits.len(), 1);
    }

    /// Local TMDB stand-in. Only requests carrying `api_key=secret` and a
    /// `language` are served.
    async fn stub() -> String {
        use axum::extract::{Path, Query};
        use axum::http::StatusCode;
        use axum::response::{IntoResponse, Response};
        use std::collections::HashMap;

        async fn movie(
            Path(id): Path<i64>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Response {
            if params.get("api_key").map(String::as_str) != Some("secret")
                || !params.contains_key("language")
            {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            match id {
                550 => axum::Json(serde_json::json!({
                    "id": 550,
                    "title": "Fight Club",
                    "release_date": "1999-10-15"
                }))
                .into_response(),
                404 => StatusCode::NOT_FOUND.into_response(),
                1 => "<html>maintenance</html>".into_response(),
                _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }

        let app = axum::Router::new().route("/movie/{id}", axum::routing::get(movie));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> TmdbClient {
        TmdbClient::new("secret".to_string()).with_base_url(base_url)
    }

    #[tokio::test]
    async fn successful_response_is_parsed() {
        let base = stub().await;
        let movie = client(&base).movie(550).await.unwrap();
        assert_eq!(movie.title, "Fight Club");
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(1999, 10, 15));
    }

    #[tokio::test]
    async fn api_key_is_sent_as_query_parameter() {
        let base = stub().await;
        let wrong = TmdbClient::new("other".to_string()).with_base_url(&base);
        assert!(matches!(wrong.movie(550).await, Err(CatalogError::Provider(_))));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let base = stub().await;
        let tmdb = client(&base);

        assert!(matches!(tmdb.movie(404).await, Err(CatalogError::NotFound)));
        assert!(matches!(tmdb.movie(500).await, Err(CatalogError::Provider(_))));
        assert!(matches!(tmdb.movie(1).await, Err(CatalogError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let tmdb = client(&format!("http://{addr}/"));
        assert!(matches!(tmdb.movie(550).await, Err(CatalogError::Network(_))));
    }
}
