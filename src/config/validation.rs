use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream(config)?;
    validate_log_level(config)?;
    validate_thought_tag(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.max_request_body_bytes == 0 {
        return Err(validation_err(
            "server.max_request_body_bytes must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_upstream(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    if !upstream.base_url.starts_with("http://") && !upstream.base_url.starts_with("https://") {
        return Err(validation_err(
            "upstream.base_url must start with http:// or https://",
        ));
    }
    if url::Url::parse(&upstream.base_url).is_err() {
        return Err(validation_err(format!(
            "upstream.base_url '{}' is not a valid URL",
            upstream.base_url
        )));
    }
    if upstream.api_key.trim().is_empty() {
        return Err(validation_err("upstream.api_key cannot be empty"));
    }
    if let Some(host) = upstream.host_header.as_deref() {
        if http::HeaderValue::from_str(host).is_err() || host.trim().is_empty() {
            return Err(validation_err(
                "upstream.host_header must be a non-empty valid header value",
            ));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_thought_tag(config: &AppConfig) -> Result<(), ConfigError> {
    let tag = &config.features.thought_tag;
    if tag.is_empty() {
        return Err(validation_err("features.thought_tag cannot be empty"));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(validation_err(format!(
            "features.thought_tag '{tag}' may only contain ASCII letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}
