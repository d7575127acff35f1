use axum::extract::{Query, State};
use axum::Json;
use marquee_core::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use marquee_core::{Pagination, SearchParams, SearchResponse};

use super::{non_empty, parse_flag, parse_or, with_deadline};
use crate::error::{AppError, Result};
use crate::model::SearchQuery;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en-US";

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let text =
        non_empty(query.query).ok_or_else(|| AppError::bad_request("query parameter required"))?;
    let language = non_empty(query.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let mut params = SearchParams::new(text, language);
    params.include_adult = parse_flag(query.include_adult.as_deref());
    params.primary_year = non_empty(query.primary_release_year)
        .or_else(|| non_empty(query.year))
        .map(|year| {
            year.parse::<i32>()
                .map_err(|_| AppError::bad_request("invalid year"))
        })
        .transpose()?;
    params.region = non_empty(query.region);

    let page = parse_or(query.page, DEFAULT_PAGE)
        .filter(|page| *page >= 1)
        .ok_or_else(|| AppError::bad_request("invalid page (must be >= 1)"))?;
    let page_size = parse_or(query.page_size, DEFAULT_PAGE_SIZE)
        .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
        .ok_or_else(|| AppError::bad_request("invalid page_size (1-100)"))?;
    params.pagination = Pagination::new(page, page_size);

    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let response = with_deadline(&state, &cancel, state.catalog().search(params)).await?;
    Ok(Json(response))
}
