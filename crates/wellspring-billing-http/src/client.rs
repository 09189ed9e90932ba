//! Shared request and response handling

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use wellspring_api::ErrorBody;
use wellspring_billing_api::{BearerToken, BillingError, BillingResult};

/// Header carrying the project's public API key
pub(crate) const API_KEY_HEADER: &str = "apikey";

pub(crate) fn build_client(timeout: Duration) -> BillingResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| BillingError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// POST to `url` with the API key and, when given, the bearer credential
pub(crate) fn post(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    token: Option<&BearerToken>,
) -> RequestBuilder {
    let mut request = client.post(url);
    if let Some(key) = api_key {
        request = request.header(API_KEY_HEADER, key);
    }
    if let Some(token) = token {
        request = request.bearer_auth(token.access_token());
    }
    request
}

pub(crate) fn transport(e: reqwest::Error) -> BillingError {
    BillingError::Transport(e.to_string())
}

/// Send a request and decode a JSON body.
///
/// 401 becomes `Unauthorized`, other non-2xx statuses become `Status`, and a
/// 2xx body carrying `{ "error": ... }` is treated as a failure too.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> BillingResult<T> {
    let response = request.send().await.map_err(transport)?;
    let body = read_body(response).await?;

    if let Some(message) = error_field(&body) {
        return Err(BillingError::Status {
            status: StatusCode::OK.as_u16(),
            message,
        });
    }

    serde_json::from_value(body).map_err(|e| BillingError::Decode(e.to_string()))
}

/// Send a request whose response body is not needed
pub(crate) async fn send_unit(request: RequestBuilder) -> BillingResult<()> {
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let text = response.text().await.unwrap_or_default();
    Err(status_error(status, &text))
}

async fn read_body(response: Response) -> BillingResult<serde_json::Value> {
    let status = response.status();
    let text = response.text().await.map_err(transport)?;
    debug!(status = %status, bytes = text.len(), "Backend response received");

    if !status.is_success() {
        return Err(status_error(status, &text));
    }

    serde_json::from_str(&text).map_err(|e| BillingError::Decode(e.to_string()))
}

fn status_error(status: StatusCode, body: &str) -> BillingError {
    let message = readable_message(status, body);
    if status == StatusCode::UNAUTHORIZED {
        BillingError::Unauthorized(message)
    } else {
        BillingError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

fn error_field(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

/// Prefer `{ "error": ... }`, then the raw body, then the status reason
fn readable_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return error;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
