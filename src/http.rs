//! Shared HTTP client construction for the JSON lookup services

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::error::{GeoRiskError, Upstream};

/// Client with a per-request timeout and transient-failure retries
pub fn retrying_client(timeout: Duration, max_retries: u32, user_agent: &str) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Map a middleware-stack failure onto the upstream taxonomy
#[must_use]
pub fn map_middleware_error(upstream: Upstream, err: &reqwest_middleware::Error) -> GeoRiskError {
    match err {
        reqwest_middleware::Error::Reqwest(e) => GeoRiskError::from_reqwest(upstream, e),
        reqwest_middleware::Error::Middleware(e) => GeoRiskError::unavailable(upstream, e.to_string()),
    }
}
