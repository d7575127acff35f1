use crate::error::StorageResult;
use crate::movie::{Credit, MovieBase};
use crate::movie_id::MovieId;
use crate::query::{DiscoverItem, DiscoverParams, ResultPage, SearchItem, SearchParams};
use async_trait::async_trait;

/// Read access to a single movie and its related collections.
///
/// Every method is an idempotent read and must be safe to call concurrently
/// with any other, for the same or different ids. Collections are returned in
/// store order.
#[async_trait]
pub trait MovieStore: Send + Sync + 'static {
    /// Retrieves the base record, localised to `lang` where a translation
    /// exists. Returns `None` if the movie does not exist.
    async fn get_base(&self, id: &MovieId, lang: &str) -> StorageResult<Option<MovieBase>>;

    /// Genre names of the movie.
    async fn fetch_genres(&self, id: &MovieId) -> StorageResult<Vec<String>>;

    /// Production company names of the movie.
    async fn fetch_companies(&self, id: &MovieId) -> StorageResult<Vec<String>>;

    /// People credited on the movie.
    async fn fetch_credits(&self, id: &MovieId) -> StorageResult<Vec<Credit>>;
}

/// List queries over the whole catalog.
///
/// Implementations expect normalized pagination.
#[async_trait]
pub trait CatalogIndex: Send + Sync + 'static {
    async fn search(&self, params: &SearchParams) -> StorageResult<ResultPage<SearchItem>>;

    async fn discover(&self, params: &DiscoverParams) -> StorageResult<ResultPage<DiscoverItem>>;
}
