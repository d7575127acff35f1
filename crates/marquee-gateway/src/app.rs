use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{discover_handler, health_handler, movie_detail_handler, search_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/movie", get(movie_detail_handler))
                    .route("/movies/search", get(search_handler))
                    .route("/movies/discover", get(discover_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
