use cronica_core::{ItemKey, MediaType, Season};

use crate::{CatalogError, CatalogItem, Person, SearchResult};

/// A read-only movie/TV catalog.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Get full details for a movie.
    async fn movie(&self, id: i64) -> Result<CatalogItem, CatalogError>;

    /// Get full details for a TV show.
    async fn show(&self, id: i64) -> Result<CatalogItem, CatalogError>;

    /// Get the episode list of one season.
    async fn season(&self, show_id: i64, season_number: i32) -> Result<Season, CatalogError>;

    /// Search movies and shows. People are not included.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, CatalogError>;

    /// Titles trending this week, optionally restricted to one media type.
    async fn trending(
        &self,
        media_type: Option<MediaType>,
    ) -> Result<Vec<SearchResult>, CatalogError>;

    async fn person(&self, id: i64) -> Result<Person, CatalogError>;

    /// Details for either kind of title.
    async fn item(&self, key: ItemKey) -> Result<CatalogItem, CatalogError> {
        match key.media_type {
            MediaType::Movie => self.movie(key.catalog_id).await,
            MediaType::TvShow => self.show(key.catalog_id).await,
        }
    }
}
