//! HTTP transport for the Marquee catalog.
//!
//! The binary in `bin/http` wires a store into [`App::router`]; tests drive
//! the same router directly.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::{AppError, Result};
pub use state::AppState;
