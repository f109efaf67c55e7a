use reqwest::Response;
use serde_json::Value;
use tracing::warn;

use crate::errors::{ServiceError, ServiceResult};

/// Map a transport-level failure (DNS, refused connection, timeout).
pub fn transport_error(service: &str, err: &reqwest::Error) -> ServiceError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ServiceError::upstream(format!("{} request failed: {}", service, reason))
}

/// Render a remote error body for a message: compact JSON when it parses,
/// trimmed text otherwise.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Read a JSON response. Error statuses keep the remote status code and
/// carry the remote body; a 2xx that is not JSON is a 502.
pub async fn read_json(service: &str, response: Response) -> ServiceResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(service, &e))?;

    if status.as_u16() >= 400 {
        warn!(service, status = status.as_u16(), "remote call returned an error status");
        return Err(ServiceError::upstream_status(
            status.as_u16(),
            format!(
                "{} API error ({}): {}",
                service,
                status.as_u16(),
                error_detail(&body)
            ),
        ));
    }

    serde_json::from_str(&body)
        .map_err(|_| ServiceError::upstream(format!("Invalid response from {}", service)))
}
