use crate::movie_id::MovieId;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Movie attributes available from a single lookup, localised where the
/// store has a translation for the requested language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieBase {
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
    pub budget: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl MovieBase {
    /// A base record with only the required fields set.
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: None,
            release_date: None,
            vote_average: None,
            vote_count: None,
            poster_path: None,
            backdrop_path: None,
            budget: None,
            revenue: None,
            homepage: None,
        }
    }
}

/// A person credited on a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub name: String,
    pub known_for: String,
    pub credit_type: String,
}

/// The data returned by one section fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    Genres(Vec<String>),
    Companies(Vec<String>),
    Credits(Vec<Credit>),
}

/// The movie detail response.
///
/// Collection fields are `None` unless the section was requested and fetched;
/// an empty collection is still serialised as `[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub base: MovieBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_companies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<Vec<Credit>>,
}

impl MovieDetail {
    pub fn from_base(base: MovieBase) -> Self {
        Self {
            base,
            genres: None,
            production_companies: None,
            credits: None,
        }
    }

    /// Attaches the data of one successfully fetched section.
    pub fn attach(&mut self, data: SectionData) {
        match data {
            SectionData::Genres(genres) => self.genres = Some(genres),
            SectionData::Companies(companies) => self.production_companies = Some(companies),
            SectionData::Credits(credits) => self.credits = Some(credits),
        }
    }
}
