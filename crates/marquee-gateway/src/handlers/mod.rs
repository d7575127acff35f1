mod discover;
mod health;
mod movie;
mod search;

pub use discover::discover_handler;
pub use health::health_handler;
pub use movie::movie_detail_handler;
pub use search::search_handler;

use std::future::Future;
use std::str::FromStr;

use marquee_core::CatalogResult;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Trims a query value and treats blank input as absent.
fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("true" | "1"))
}

/// `Some(default)` when the value is absent, `None` when it does not parse.
fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> Option<T> {
    match non_empty(raw) {
        Some(value) => value.parse().ok(),
        None => Some(default),
    }
}

/// Runs a catalog call under the request deadline.
///
/// On expiry the request token is cancelled before the call is dropped, so
/// in-flight section fetches observe the cancellation.
async fn with_deadline<T>(
    state: &AppState,
    cancel: &CancellationToken,
    call: impl Future<Output = CatalogResult<T>>,
) -> Result<T> {
    let deadline = state.request_timeout();

    match tokio::time::timeout(deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            cancel.cancel();
            warn!(
                timeout_ms = deadline.as_millis() as u64,
                "request deadline exceeded"
            );
            Err(AppError::gateway_timeout("request deadline exceeded"))
        }
    }
}
