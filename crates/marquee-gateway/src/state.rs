use std::sync::Arc;
use std::time::Duration;

use marquee_core::Catalog;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, TypedBuilder)]
pub struct AppState {
    catalog: Arc<dyn Catalog>,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    request_timeout: Duration,
    /// Parent of every per-request token; cancelled on shutdown.
    #[builder(default)]
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::builder().catalog(catalog).build()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// A token for one request, cancelled when the server shuts down.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
