mod request_id;

use crate::config::AppConfig;
use crate::error::ProxyError;
use crate::protocol::markers::ThoughtMarkers;
use crate::transport::{HttpTransport, PreparedUpstream};

pub use request_id::RequestId;
use request_id::RequestIds;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub upstream: PreparedUpstream,
    pub markers: ThoughtMarkers,
    request_ids: RequestIds,
}

impl AppState {
    /// Build the shared state from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the upstream credentials cannot be
    /// turned into request headers.
    pub fn new(config: AppConfig, transport: HttpTransport) -> Result<Self, ProxyError> {
        let upstream = PreparedUpstream::new(&config.upstream)?;
        let markers = ThoughtMarkers::new(&config.features.thought_tag);
        Ok(Self {
            config,
            transport,
            upstream,
            markers,
            request_ids: RequestIds::new(),
        })
    }

    /// Identifier attached to the log lines of one proxied request.
    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        self.request_ids.next()
    }
}
