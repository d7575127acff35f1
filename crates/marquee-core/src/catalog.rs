use crate::error::CatalogResult;
use crate::movie::MovieDetail;
use crate::movie_id::MovieId;
use crate::query::{DiscoverParams, DiscoverResponse, SearchParams, SearchResponse};
use crate::section::SectionRequest;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Catalog: Send + Sync + 'static {
    /// Resolves a movie with the requested sections appended.
    ///
    /// Cancelling `cancel` aborts the lookup and any in-flight section fetch.
    async fn movie_detail(
        &self,
        cancel: &CancellationToken,
        id: &MovieId,
        lang: &str,
        sections: &SectionRequest,
    ) -> CatalogResult<MovieDetail>;

    /// Free-text search over titles and overviews.
    async fn search(&self, params: SearchParams) -> CatalogResult<SearchResponse>;

    /// Faceted filtering over the catalog.
    async fn discover(&self, params: DiscoverParams) -> CatalogResult<DiscoverResponse>;
}
