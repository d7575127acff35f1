use crate::movie_id::MovieId;
use crate::pagination::Pagination;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One page of results as returned by a store, with the total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage<T> {
    pub total: u64,
    pub items: Vec<T>,
}

/// Parameters of a free-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub language: String,
    pub include_adult: bool,
    pub primary_year: Option<i32>,
    /// Origin country of at least one production company.
    pub region: Option<String>,
    pub pagination: Pagination,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: language.into(),
            include_adult: false,
            primary_year: None,
            region: None,
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub page: u32,
    pub total_results: u64,
    pub total_pages: u64,
    pub results: Vec<SearchItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Popularity,
    ReleaseDate,
    VoteAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Ordering of discover results, written as `<field>.<asc|desc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortKey {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Parses a sort key leniently: an unknown field yields the default key
    /// and an unknown direction yields descending.
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        let (field, order) = match raw.split_once('.') {
            Some((field, order)) => (field, Some(order)),
            None => (raw.as_str(), None),
        };

        let field = match field {
            "popularity" => SortField::Popularity,
            "release_date" => SortField::ReleaseDate,
            "vote_average" => SortField::VoteAverage,
            _ => return Self::default(),
        };
        let order = match order {
            Some("asc") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        };

        Self { field, order }
    }

    pub fn as_str(&self) -> &'static str {
        match (self.field, self.order) {
            (SortField::Popularity, SortOrder::Ascending) => "popularity.asc",
            (SortField::Popularity, SortOrder::Descending) => "popularity.desc",
            (SortField::ReleaseDate, SortOrder::Ascending) => "release_date.asc",
            (SortField::ReleaseDate, SortOrder::Descending) => "release_date.desc",
            (SortField::VoteAverage, SortOrder::Ascending) => "vote_average.asc",
            (SortField::VoteAverage, SortOrder::Descending) => "vote_average.desc",
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenreMatch {
    /// The movie must carry every listed genre.
    All,
    /// The movie must carry at least one listed genre.
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenreFilter {
    pub ids: Vec<String>,
    pub mode: GenreMatch,
}

impl GenreFilter {
    /// Parses `a,b` as all-of and `a|b` as any-of. Blank ids are dropped.
    pub fn parse(raw: &str) -> Self {
        let (mode, separator) = if raw.contains(',') {
            (GenreMatch::All, ',')
        } else {
            (GenreMatch::Any, '|')
        };
        let ids = raw
            .split(separator)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Self { ids, mode }
    }
}

/// Parameters of a faceted discover query.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverParams {
    pub language: String,
    pub include_adult: bool,
    pub sort: SortKey,
    pub genres: GenreFilter,
    pub release_date_gte: Option<Date>,
    pub release_date_lte: Option<Date>,
    pub vote_average_gte: Option<f64>,
    pub vote_average_lte: Option<f64>,
    pub pagination: Pagination,
}

impl DiscoverParams {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            include_adult: false,
            sort: SortKey::default(),
            genres: GenreFilter::default(),
            release_date_gte: None,
            release_date_lte: None,
            vote_average_gte: None,
            vote_average_lte: None,
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverItem {
    pub id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    pub genre_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub page: u32,
    pub page_size: u32,
    pub total_results: u64,
    pub total_pages: u64,
    pub results: Vec<DiscoverItem>,
}
