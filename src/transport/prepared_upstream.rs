use http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

/// Request headers never copied upstream: hop-by-hop headers, headers the
/// transport recomputes, and the client's own credentials.
static DROPPED_REQUEST_HEADERS: [HeaderName; 11] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
    // Compressed bodies cannot be rewritten line by line.
    header::ACCEPT_ENCODING,
    header::AUTHORIZATION,
];

/// Response headers never relayed to the client; the body may be rewritten.
static DROPPED_RESPONSE_HEADERS: [HeaderName; 6] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::CONTENT_ENCODING,
    header::TRAILER,
    header::UPGRADE,
];

/// Upstream metadata computed once at startup.
#[derive(Debug, Clone)]
pub struct PreparedUpstream {
    base_url: String,
    authorization: HeaderValue,
    host: Option<HeaderValue>,
}

impl PreparedUpstream {
    /// Build the prepared upstream from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the API key or host override cannot be
    /// used as a header value.
    pub fn new(upstream: &UpstreamConfig) -> Result<Self, ProxyError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", upstream.api_key))
            .map_err(|_| ProxyError::Config("upstream.api_key is not a valid header value".into()))?;
        authorization.set_sensitive(true);
        let host = upstream
            .host_header
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|_| ProxyError::Config("upstream.host_header is not a valid header value".into()))?;

        Ok(Self {
            base_url: upstream.base_url.trim_end_matches('/').to_owned(),
            authorization,
            host,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream URL for a client request path (query string included).
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] when the joined URL does not parse.
    pub fn target_url(&self, path_and_query: &str) -> Result<url::Url, ProxyError> {
        let mut target = String::with_capacity(self.base_url.len() + path_and_query.len());
        target.push_str(&self.base_url);
        if !path_and_query.starts_with('/') {
            target.push('/');
        }
        target.push_str(path_and_query);
        url::Url::parse(&target)
            .map_err(|err| ProxyError::InvalidRequest(format!("invalid upstream URL '{target}': {err}")))
    }

    /// Client request headers as they should be sent upstream.
    #[must_use]
    pub fn forward_headers(&self, incoming: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(incoming.len() + 2);
        for (name, value) in incoming {
            if DROPPED_REQUEST_HEADERS.contains(name) || is_keep_alive(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        headers.insert(header::AUTHORIZATION, self.authorization.clone());
        if let Some(host) = &self.host {
            headers.insert(header::HOST, host.clone());
        }
        headers
    }
}

/// Upstream response headers as they should be relayed to the client.
#[must_use]
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if DROPPED_RESPONSE_HEADERS.contains(name) || is_keep_alive(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_keep_alive(name: &HeaderName) -> bool {
    name.as_str() == "keep-alive" || name.as_str() == "proxy-connection"
}
