//! Core types and traits for the Marquee movie catalog.
//!
//! This crate provides the domain model shared by the stores, the catalog
//! service and the HTTP gateway.

pub mod catalog;
pub mod error;
pub mod movie;
pub mod movie_id;
pub mod pagination;
pub mod query;
pub mod section;
pub mod store;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult, CoreError, Operation, StorageError, StorageResult};
pub use movie::{Credit, MovieBase, MovieDetail, SectionData};
pub use movie_id::MovieId;
pub use pagination::Pagination;
pub use query::{
    DiscoverItem, DiscoverParams, DiscoverResponse, GenreFilter, GenreMatch, ResultPage,
    SearchItem, SearchParams, SearchResponse, SortField, SortKey, SortOrder,
};
pub use section::{Section, SectionRequest};
pub use store::{CatalogIndex, MovieStore};
