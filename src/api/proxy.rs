use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::ProxyError;
use crate::normalize::normalize_request_body;
use crate::observability::log_exchange_body;
use crate::state::AppState;
use crate::stream::{transform_event_stream, ReasoningStreamTransformer};
use crate::transport::relay_response_headers;

const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Forward one client request upstream and relay the answer.
///
/// The request body is normalized before forwarding. A successful event-stream
/// response is rewritten line by line; anything else is relayed unchanged.
pub(crate) async fn handler(
    state: Arc<AppState>,
    parts: Parts,
    body: Body,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let limit = state.config.server.max_request_body_bytes;
    let client_body = body::to_bytes(body, limit)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge { limit })?;

    let features = &state.config.features;
    let upstream_body =
        normalize_request_body(client_body.clone(), features.reasoning_mode, &state.markers);
    if upstream_body != client_body {
        tracing::debug!(
            before = client_body.len(),
            after = upstream_body.len(),
            "request body normalized"
        );
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
    let url = state.upstream.target_url(path_and_query)?;
    let headers = state.upstream.forward_headers(&parts.headers);

    let upstream = state
        .transport
        .send(parts.method, url, headers, upstream_body)
        .await?;

    let status = upstream.status();
    let relayed_headers = relay_response_headers(upstream.headers());

    let body = if status == StatusCode::OK && is_event_stream(upstream.headers()) {
        let transformer =
            ReasoningStreamTransformer::new(features.reasoning_mode, state.markers.clone());
        Body::from_stream(
            transform_event_stream(upstream.bytes_stream(), transformer)
                .map(Ok::<Bytes, Infallible>),
        )
    } else if features.debug_exchanges {
        let response_body = upstream.bytes().await.map_err(|err| {
            ProxyError::UpstreamUnavailable(format!("failed to read upstream response body: {err}"))
        })?;
        log_exchange_body(request_id, "client request", &client_body);
        tracing::info!(request_id, status = status.as_u16(), "upstream response status");
        log_exchange_body(request_id, "upstream response", &response_body);
        Body::from(response_body)
    } else {
        Body::from_stream(upstream.bytes_stream())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = relayed_headers;
    Ok(response)
}

/// `true` when the media type is `text/event-stream`, whatever its parameters.
fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(EVENT_STREAM_MEDIA_TYPE))
}
