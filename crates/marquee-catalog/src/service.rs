use std::sync::Arc;

use crate::assembler::DetailAssembler;
use async_trait::async_trait;
use marquee_core::{
    Catalog, CatalogError, CatalogIndex, CatalogResult, DiscoverParams, DiscoverResponse,
    MovieDetail, MovieId, MovieStore, Operation, SearchParams, SearchResponse, SectionRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A concrete implementation of the [`Catalog`] trait.
///
/// Wraps a store to handle:
/// - Movie detail lookups through a [`DetailAssembler`]
/// - Pagination normalization for search and discover
/// - Page count computation
#[derive(Debug)]
pub struct CatalogService<S> {
    store: Arc<S>,
    assembler: DetailAssembler<S>,
}

impl<S> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            assembler: self.assembler.clone(),
        }
    }
}

impl<S: MovieStore + CatalogIndex> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            assembler: DetailAssembler::new(Arc::clone(&store)),
            store,
        }
    }
}

#[async_trait]
impl<S: MovieStore + CatalogIndex> Catalog for CatalogService<S> {
    async fn movie_detail(
        &self,
        cancel: &CancellationToken,
        id: &MovieId,
        lang: &str,
        sections: &SectionRequest,
    ) -> CatalogResult<MovieDetail> {
        self.assembler.resolve(cancel, id, lang, sections).await
    }

    async fn search(&self, mut params: SearchParams) -> CatalogResult<SearchResponse> {
        params.pagination = params.pagination.normalized();
        debug!(query = %params.query, language = %params.language, page = params.pagination.page, "searching movies");

        let page = self
            .store
            .search(&params)
            .await
            .map_err(|source| CatalogError::store(Operation::Search, source))?;

        Ok(SearchResponse {
            page: params.pagination.page,
            total_results: page.total,
            total_pages: params.pagination.total_pages(page.total),
            results: page.items,
        })
    }

    async fn discover(&self, mut params: DiscoverParams) -> CatalogResult<DiscoverResponse> {
        params.pagination = params.pagination.normalized();
        debug!(sort = %params.sort, genres = params.genres.ids.len(), page = params.pagination.page, "discovering movies");

        let page = self
            .store
            .discover(&params)
            .await
            .map_err(|source| CatalogError::store(Operation::Discover, source))?;

        Ok(DiscoverResponse {
            page: params.pagination.page,
            page_size: params.pagination.page_size,
            total_results: page.total,
            total_pages: params.pagination.total_pages(page.total),
            results: page.items,
        })
    }
}
