//! Preconditions checked before any outbound call.

use crate::errors::{ServiceError, ServiceResult};

/// Pick the agent to act on: the per-request value, else the configured
/// default. Blank values count as absent.
pub fn resolve_agent_id(requested: Option<&str>, fallback: Option<&str>) -> ServiceResult<String> {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| fallback.map(str::trim).filter(|id| !id.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::invalid_request(
                "No agent_id provided and ELEVENLABS_AGENT_ID is not configured",
            )
        })
}

/// Require a configured secret, naming the variable that should carry it.
pub fn require_credential<'a>(value: Option<&'a str>, name: &str) -> ServiceResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::not_configured(format!("{} is not configured", name)))
}
