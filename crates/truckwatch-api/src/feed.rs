// Telemetry feed HTTP client
//
// Wraps `reqwest::Client` with status checking, JSON decoding, and
// envelope unwrapping. Callers get a flat list of raw records or an
// error; they never see the envelope.

use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use crate::envelope::{RawRecord, unwrap_records};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest body excerpt carried inside an error.
const BODY_PREVIEW_LEN: usize = 200;

/// HTTP client for one upstream truck telemetry feed.
///
/// Stateless between calls: every [`fetch_batch`](Self::fetch_batch)
/// issues a fresh `GET` against the configured URL.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl FeedClient {
    /// Create a feed client from a `TransportConfig`.
    pub fn new(url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            url,
            timeout: transport.timeout,
        })
    }

    /// Create a feed client with a pre-built `reqwest::Client`.
    ///
    /// Requests use the default transport timeout until
    /// [`with_timeout`](Self::with_timeout) says otherwise.
    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            url,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The feed URL this client polls.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch one batch of raw truck records.
    ///
    /// Non-2xx responses and undecodable bodies are errors. A decodable
    /// body without any record array is an empty batch, not an error.
    pub async fn fetch_batch(&self) -> Result<Vec<RawRecord>, Error> {
        debug!("GET {}", self.url);

        let resp = self
            .http
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body_preview: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            })?;

        let records = unwrap_records(payload);
        trace!(count = records.len(), "feed batch decoded");
        Ok(records)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Cut a body down to at most `BODY_PREVIEW_LEN` bytes on a char boundary.
fn preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_LEN {
        return body;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
