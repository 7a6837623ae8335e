use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::ProxyError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(config: &ServerConfig) -> Result<reqwest::Client, ProxyError> {
    let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
    };

    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout));

    if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ProxyError::Config(format!("Failed to build HTTP client: {err}")))
}

/// Pooled HTTP client used for every upstream request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with connection pooling and timeouts from the given server config.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let client = match build_reqwest_client(config) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                reqwest::Client::new()
            }
        };
        Self { client }
    }

    /// Send one request upstream. The response body is left unread so callers
    /// can stream it.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UpstreamUnavailable`] when the connection cannot be
    /// made or the request times out. Upstream HTTP error statuses are not errors.
    pub async fn send(
        &self,
        method: http::Method,
        url: url::Url,
        headers: http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut request = reqwest::Request::new(method, url);
        *request.headers_mut() = headers;
        if !body.is_empty() {
            *request.body_mut() = Some(reqwest::Body::from(body));
        }

        self.client
            .execute(request)
            .await
            .map_err(|err| ProxyError::UpstreamUnavailable(describe_transport_error(&err)))
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("upstream request timed out: {err}")
    } else if err.is_connect() {
        format!("failed to connect to upstream: {err}")
    } else {
        err.to_string()
    }
}
