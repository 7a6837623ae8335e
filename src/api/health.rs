use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary; never contacts the upstream.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "thinkbridge is running",
        "config": {
            "upstream": state.upstream.base_url(),
            "features": {
                "log_level": config.features.log_level,
                "reasoning_mode": config.features.reasoning_mode.to_string(),
                "thought_tag": config.features.thought_tag,
                "debug_exchanges": config.features.debug_exchanges,
            }
        }
    }))
}
