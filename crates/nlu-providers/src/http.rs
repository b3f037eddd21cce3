//! Mapping HTTP responses onto [`RemoteError`].

use chrono::{DateTime, Utc};
use nlu_abstraction::{RemoteError, RemoteErrorKind};
use reqwest::header::RETRY_AFTER;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

pub(crate) fn network_error(service: &str, err: &reqwest::Error) -> RemoteError {
    error!(service, error = %err, "Request failed to complete");
    RemoteError::new(service, RemoteErrorKind::Network, err.to_string())
}

/// Returns the response when successful, or the classified error otherwise.
pub(crate) async fn check_status(service: &str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, Utc::now()));
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    debug!(service, status = %status, error = %body, "Request returned error status");

    Err(RemoteError::from_status(service, status.as_u16(), error_message(&body)).with_retry_after(retry_after))
}

pub(crate) async fn read_json<T: DeserializeOwned>(service: &str, response: Response) -> Result<T, RemoteError> {
    let response = check_status(service, response).await?;
    response.json::<T>().await.map_err(|e| {
        error!(service, error = %e, "Failed to parse response");
        RemoteError::new(service, RemoteErrorKind::Other, format!("Failed to parse response: {e}"))
    })
}

/// Parses a `Retry-After` value given as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((date - now).to_std().unwrap_or(Duration::ZERO))
}

/// Pulls a readable message out of the provider's error body.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    let message = json
        .get("message")
        .or_else(|| json.get("Message"))
        .or_else(|| json.pointer("/error/message"))
        .and_then(serde_json::Value::as_str);
    message.map_or_else(|| body.to_string(), str::to_string)
}
