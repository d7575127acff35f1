use axum::extract::{Query, State};
use axum::Json;
use jiff::civil::Date;
use marquee_core::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use marquee_core::{DiscoverParams, DiscoverResponse, GenreFilter, Pagination, SortKey};
use uuid::Uuid;

use super::{non_empty, parse_flag, parse_or, with_deadline};
use crate::error::{AppError, Result};
use crate::model::DiscoverQuery;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en";

fn parse_date(raw: Option<String>, name: &str) -> Result<Option<Date>> {
    non_empty(raw)
        .map(|value| {
            value
                .parse::<Date>()
                .ok()
                .filter(|date| date.year() >= 1)
                .ok_or_else(|| {
                    AppError::bad_request(format!("invalid {name} (expected YYYY-MM-DD)"))
                })
        })
        .transpose()
}

fn parse_vote(raw: Option<String>, name: &str) -> Result<Option<f64>> {
    non_empty(raw)
        .map(|value| {
            value
                .parse::<f64>()
                .ok()
                .filter(|vote| vote.is_finite())
                .ok_or_else(|| AppError::bad_request(format!("invalid {name}")))
        })
        .transpose()
}

fn parse_genres(raw: Option<String>) -> Result<GenreFilter> {
    let Some(raw) = non_empty(raw) else {
        return Ok(GenreFilter::default());
    };

    let mut filter = GenreFilter::parse(&raw);
    filter.ids = filter
        .ids
        .iter()
        .map(|id| {
            Uuid::parse_str(id)
                .map(|uuid| uuid.hyphenated().to_string())
                .map_err(|_| AppError::bad_request(format!("invalid genre id '{id}'")))
        })
        .collect::<Result<_>>()?;
    Ok(filter)
}

pub async fn discover_handler(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Result<Json<DiscoverResponse>> {
    let language = non_empty(query.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let mut params = DiscoverParams::new(language);
    params.include_adult = parse_flag(query.include_adult.as_deref());
    params.sort = non_empty(query.sort_by)
        .map(|raw| SortKey::parse_lenient(&raw))
        .unwrap_or_default();
    params.genres = parse_genres(query.with_genres)?;
    params.release_date_gte = parse_date(query.release_gte, "releaseGTE")?;
    params.release_date_lte = parse_date(query.release_lte, "releaseLTE")?;
    params.vote_average_gte = parse_vote(query.vote_average_gte, "VoteAvgGTE")?;
    params.vote_average_lte = parse_vote(query.vote_average_lte, "VoteAvgLTE")?;

    // Unusable paging falls back to the defaults instead of failing.
    let page = parse_or(query.page, DEFAULT_PAGE).unwrap_or(DEFAULT_PAGE);
    let page_size = parse_or(query.page_size, DEFAULT_PAGE_SIZE)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    params.pagination = Pagination::new(page, page_size);

    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let response = with_deadline(&state, &cancel, state.catalog().discover(params)).await?;
    Ok(Json(response))
}
