//! Shared HTTP plumbing for provider readers and repository probes.
//!
//! Every call is bounded by the configured timeout. Transport failures,
//! timeouts and 5xx responses become `Reply::Unavailable`; any 4xx that the
//! caller did not ask to see is an authentication failure.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};

const USER_AGENT: &str = concat!("catapult/", env!("CARGO_PKG_VERSION"));

/// Build a blocking client with connect and total timeouts.
pub fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Client(e.to_string()).into())
}

/// Outcome of one HTTP call.
#[derive(Debug)]
pub enum Reply {
    Ok(Response),
    Unavailable(String),
}

/// Send a request and classify the response.
///
/// Statuses listed in `pass` are returned to the caller as `Reply::Ok`
/// even when they are client errors (for example 404 on a probe).
pub fn send(provider: &'static str, request: RequestBuilder, pass: &[u16]) -> Result<Reply> {
    let response = match request.send() {
        Ok(response) => response,
        Err(e) => {
            warn!(provider, error = %e, "request failed");
            return Ok(Reply::Unavailable(e.to_string()));
        }
    };

    let status = response.status();
    debug!(provider, status = status.as_u16(), "response");

    if status.is_success() || pass.contains(&status.as_u16()) {
        return Ok(Reply::Ok(response));
    }
    if status.is_client_error() {
        return Err(ProviderError::Auth {
            provider,
            status: status.as_u16(),
        }
        .into());
    }
    Ok(Reply::Unavailable(format!("HTTP {}", status.as_u16())))
}

/// Decode a JSON body, treating a malformed payload as unavailability.
pub fn json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> std::result::Result<T, String> {
    response.json::<T>().map_err(|e| {
        warn!(provider, error = %e, "malformed payload");
        format!("malformed {} payload: {}", provider, e)
    })
}
