//! HTTP client for the Doc2X v2 API.
//!
//! [`Client`] owns two `reqwest` clients:
//!
//! * the **API** client carries the bearer token and the short per-request
//!   timeout, and talks to `base_url`;
//! * the **transfer** client has no auth header and a long timeout, and is
//!   used for presigned OSS uploads and result downloads, which point at
//!   third-party hosts that must never see the API key.
//!
//! Every call takes a [`Context`]; the request is raced against it so
//! cancellation (Ctrl-C, a caller deadline) aborts in-flight I/O.
//!
//! The methods are split by API area into submodules:
//! [`parse`], [`convert`], [`image`] and [`download`].

pub mod convert;
pub mod download;
pub mod image;
pub mod parse;

use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::{normalize_trace_id, Doc2xError};
use crate::poll::PollOptions;
use crate::types::{ApiResponse, Operation, API_VERSION, SERVICE_NAME, TRACE_ID_HEADER};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Doc2X API client. Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug, Clone)]
pub struct Client {
    api: reqwest::Client,
    transfer: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Build a client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, Doc2xError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
            Doc2xError::InvalidConfig("api key contains characters not allowed in a header".into())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("doc2x-rs/{}", env!("CARGO_PKG_VERSION")));

        let api = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| Doc2xError::InvalidConfig(format!("http client: {e}")))?;

        let transfer = reqwest::Client::builder()
            .timeout(config.transfer_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Doc2xError::InvalidConfig(format!("transfer client: {e}")))?;

        Ok(Self {
            api,
            transfer,
            config,
        })
    }

    /// Shorthand for a client with default settings and the given key.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, Doc2xError> {
        Self::new(ClientConfig::builder().api_key(api_key).build()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Service name, `"doc2x"`.
    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    /// API version, `"v2"`.
    pub fn version(&self) -> &'static str {
        API_VERSION
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    fn poll_options(&self, operation: Operation, interval: Duration) -> PollOptions {
        PollOptions::new(operation)
            .interval(interval)
            .timeout(self.config.processing_timeout)
            .retry_budget(self.config.retry_budget)
    }

    /// Send an API request and decode the envelope.
    ///
    /// Non-2xx statuses become [`Doc2xError::Status`], a non-success `code`
    /// becomes [`Doc2xError::Api`]; both carry the server trace id.
    async fn send_api<D>(
        &self,
        ctx: &Context,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<ApiResponse<D>, Doc2xError>
    where
        D: DeserializeOwned,
    {
        ctx.run(operation, async {
            let response = request
                .send()
                .await
                .map_err(|source| Doc2xError::Http { operation, source })?;

            let (response, trace_id) = check_status(operation, response)?;

            let body = response
                .bytes()
                .await
                .map_err(|source| Doc2xError::Http { operation, source })?;

            let mut parsed: ApiResponse<D> = serde_json::from_slice(&body)
                .map_err(|source| Doc2xError::MalformedResponse { operation, source })?;
            parsed.trace_id = trace_id;

            if !parsed.is_success() {
                return Err(Doc2xError::Api {
                    operation,
                    code: parsed.code,
                    msg: parsed.msg,
                    trace_id: normalize_trace_id(&parsed.trace_id),
                });
            }

            debug!(%operation, trace_id = %parsed.trace_id, "api call succeeded");
            Ok(parsed)
        })
        .await
    }
}

/// Read the trace id and reject non-2xx responses.
fn check_status(operation: Operation, response: Response) -> Result<(Response, String), Doc2xError> {
    let trace_id = trace_id_of(&response);
    let status = response.status();
    if !status.is_success() {
        return Err(Doc2xError::Status {
            operation,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            trace_id: normalize_trace_id(&trace_id),
        });
    }
    Ok((response, trace_id))
}

fn trace_id_of(response: &Response) -> String {
    response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
