mod health;
mod query;

pub use health::HealthResponse;
pub use query::{DiscoverQuery, MovieDetailQuery, SearchQuery};
