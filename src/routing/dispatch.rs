use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::api::{health, proxy};
use crate::state::AppState;

const HEALTH_PATH: &str = "/healthz";

enum RouteMatch {
    Health,
    Proxy,
}

/// Dispatch a raw HTTP request: answer health checks locally and proxy
/// everything else.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();

    match match_route(&parts.method, parts.uri.path()) {
        RouteMatch::Health => Ok(health::health_handler(State(state)).into_response()),
        RouteMatch::Proxy => {
            let started = Instant::now();
            let request_id = state.next_request_id();
            let request_tag = request_id.to_string();
            let method = parts.method.clone();
            let path = parts.uri.path().to_owned();
            let span = tracing::info_span!("request", request_id = %request_tag);

            let response = match proxy::handler(state, parts, body, &request_tag)
                .instrument(span.clone())
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(parent: &span, error = %err, "request failed");
                    err.into_response()
                }
            };

            tracing::info!(
                parent: &span,
                seq = request_id.seq(),
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "proxied request"
            );
            Ok(response)
        }
    }
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    if method == Method::GET && path == HEALTH_PATH {
        RouteMatch::Health
    } else {
        RouteMatch::Proxy
    }
}
