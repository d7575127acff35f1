use axum::extract::{Query, State};
use axum::Json;
use marquee_core::{MovieDetail, MovieId, SectionRequest};
use tracing::debug;

use super::{non_empty, with_deadline};
use crate::error::{AppError, Result};
use crate::model::MovieDetailQuery;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en";

pub async fn movie_detail_handler(
    State(state): State<AppState>,
    Query(query): Query<MovieDetailQuery>,
) -> Result<Json<MovieDetail>> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("Movie id needed"))?;
    let id = MovieId::new(id).map_err(|_| AppError::bad_request("Invalid movie ID"))?;
    let lang = non_empty(query.lang).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let sections = query
        .append_to_response
        .as_deref()
        .map(|raw| SectionRequest::from_tags(raw.split(',')))
        .unwrap_or_default();

    // Dropping the handler (client gone) cancels the lookup.
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    debug!(movie_id = %id, %lang, %sections, "resolving movie detail");
    let detail = with_deadline(
        &state,
        &cancel,
        state.catalog().movie_detail(&cancel, &id, &lang, &sections),
    )
    .await?;

    Ok(Json(detail))
}
