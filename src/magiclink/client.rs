//! Client for the Mideye Magic Link endpoint.
//!
//! `GET {mideye_url}/api/sfwa/auth?msisdn=<phone>` blocks on the server side
//! until the user answers the push notification or SMS challenge, so the
//! request timeout is much longer than usual (120 s by default).

use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{HeaderValue, ACCEPT},
    Client, StatusCode,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

pub const AUTH_PATH: &str = "/api/sfwa/auth";

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS, TLS, timeout or a failure while reading the body.
    #[error("{}", describe(.0))]
    Transport(#[source] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ClientError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries the phone number.
        Self::Transport(err.without_url())
    }
}

// reqwest only prints the outermost message; hyper keeps the useful part
// ("Connection refused", "operation timed out") further down the chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Bodies longer than this are cut in debug logs.
const BODY_PREVIEW_CHARS: usize = 200;

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    code: String,
}

/// Build `{base}/api/sfwa/auth`, keeping any path prefix the base URL has.
#[must_use]
pub fn endpoint_url(base: &Url) -> Url {
    let mut endpoint = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    endpoint.set_path(&format!("{prefix}{AUTH_PATH}"));
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    endpoint
}

#[derive(Debug, Clone)]
pub struct MideyeClient {
    http: Client,
    endpoint: Url,
    api_key: HeaderValue,
}

impl MideyeClient {
    /// Build the shared HTTP client from the startup configuration.
    ///
    /// # Errors
    /// Returns an error if the API key is not a valid header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(globals: &GlobalArgs) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(globals.api_key.expose_secret())
            .map_err(|_| anyhow!("API key contains characters not allowed in an HTTP header"))?;
        api_key.set_sensitive(true);

        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(globals.timeout)
            .connect_timeout(globals.connect_timeout);

        if globals.skip_tls_verify {
            warn!("TLS certificate verification is DISABLED for the Mideye Server (testing only)");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("Error creating reqwest client")?;

        Ok(Self {
            http,
            endpoint: endpoint_url(&globals.mideye_url),
            api_key,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the Mideye Server to authenticate `phone` and wait for the answer.
    ///
    /// The returned code is not interpreted here: `TOUCH_ACCEPTED` and
    /// `TOUCH_REJECTED` are both `Ok`.
    ///
    /// # Errors
    /// [`ClientError::Transport`] or [`ClientError::Status`] when no usable
    /// response arrived, [`ClientError::Parse`] when the body is not `{"code": "..."}`.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn authenticate(&self, phone: &str) -> Result<String, ClientError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("msisdn", phone);

        debug!("GET {}?msisdn=***", self.endpoint);

        let response = self
            .http
            .get(url)
            .header("api-key", self.api_key.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        let body = response.text().await?;

        debug!("response status={} body={}", status, preview(&body));

        let parsed: AuthResponse = serde_json::from_str(&body)?;

        Ok(parsed.code)
    }
}
