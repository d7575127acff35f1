use serde::Deserialize;

// Every field is kept as raw text so that malformed values reach the
// handlers and get their own error messages.

#[derive(Debug, Default, Deserialize)]
pub struct MovieDetailQuery {
    pub id: Option<String>,
    pub lang: Option<String>,
    pub append_to_response: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub language: Option<String>,
    pub include_adult: Option<String>,
    pub primary_release_year: Option<String>,
    pub year: Option<String>,
    pub region: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverQuery {
    pub language: Option<String>,
    pub include_adult: Option<String>,
    pub sort_by: Option<String>,
    pub with_genres: Option<String>,
    #[serde(rename = "releaseGTE")]
    pub release_gte: Option<String>,
    #[serde(rename = "releaseLTE")]
    pub release_lte: Option<String>,
    #[serde(rename = "VoteAvgGTE")]
    pub vote_average_gte: Option<String>,
    #[serde(rename = "VoteAvgLTE")]
    pub vote_average_lte: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}
