//! Retrying HTTP fetcher.
//!
//! Wraps the per-invocation `reqwest::Client` with the asset's auth headers
//! and the fixed retry policy. A failed fetch is an error value — callers
//! decide whether to skip the resource or abort the invocation.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, warn};

use vodmirror_core::MirrorError;

/// Content type some packagers mislabel manifests with.
const GENERIC_BINARY_CONTENT_TYPE: &str = "binary/octet-stream";

/// Auth-header alias some callers pass following the packager documentation;
/// origins require the literal `X-`-prefixed header name.
const MEDIA_PACKAGE_AUTH_ALIAS: &str = "MediaPackageCDNIdentifier";
const MEDIA_PACKAGE_AUTH_HEADER: &str = "X-MediaPackage-CDNIdentifier";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("{url}: expected {expected} bytes, received {received}")]
    LengthMismatch {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error("{url}: manifest body is not valid UTF-8")]
    NotText { url: String },

    #[error("invalid auth header '{0}'")]
    InvalidHeader(String),
}

/// Map a manifest fetch failure to the fatal entry-level error.
pub(crate) fn manifest_unavailable(url: &str, err: FetchError) -> MirrorError {
    MirrorError::ManifestUnavailable {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

/// Rewrite recognized auth-header aliases to the literal header names origins
/// expect. Unrecognized names pass through unchanged.
pub fn rewrite_auth_aliases(headers: &HashMap<String, String>) -> HashMap<String, String> {
    let mut rewritten = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == MEDIA_PACKAGE_AUTH_ALIAS {
            rewritten.insert(MEDIA_PACKAGE_AUTH_HEADER.to_string(), value.clone());
        } else {
            rewritten.insert(name.clone(), value.clone());
        }
    }
    rewritten
}

pub struct RetryingFetcher {
    client: Client,
    headers: HeaderMap,
    attempts: u32,
    retry_pause: Duration,
}

impl RetryingFetcher {
    /// Build a fetcher around an explicitly supplied client (one pool per
    /// invocation). Auth-header aliasing is applied here, once.
    pub fn new(
        client: Client,
        auth_headers: Option<&HashMap<String, String>>,
        attempts: u32,
        retry_pause: Duration,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(map) = auth_headers {
            for (name, value) in rewrite_auth_aliases(map) {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
                let header_value = HeaderValue::from_str(&value)
                    .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
                headers.insert(header_name, header_value);
            }
        }
        Ok(Self {
            client,
            headers,
            attempts: attempts.max(1),
            retry_pause,
        })
    }

    /// Perform one GET with the configured retry policy. Returns the payload
    /// and the content type the origin announced.
    pub async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>), FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= self.attempts {
                        warn!(url = url, attempts = attempt, error = %err, "Fetch failed on final attempt");
                        return Err(err);
                    }
                    debug!(url = url, attempt = attempt, error = %err, "Fetch attempt failed, retrying");
                    tokio::time::sleep(self.retry_pause).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<(Bytes, Option<String>), FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Not all servers return Content-Length; when present it guards
        // against truncated or corrupted transfers.
        let declared_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        if let Some(expected) = declared_length {
            let received = body.len() as u64;
            if received != expected {
                return Err(FetchError::LengthMismatch {
                    url: url.to_string(),
                    expected,
                    received,
                });
            }
        }

        Ok((body, content_type))
    }

    /// Fetch a manifest document: as `fetch`, plus UTF-8 decoding and
    /// correction of a generically-labelled content type to the expected
    /// manifest type.
    pub async fn fetch_manifest(
        &self,
        url: &str,
        expected_content_type: &str,
    ) -> Result<(String, String), FetchError> {
        let (bytes, content_type) = self.fetch(url).await?;
        let body = String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::NotText {
            url: url.to_string(),
        })?;

        let content_type = match content_type {
            Some(ct) if ct != GENERIC_BINARY_CONTENT_TYPE => ct,
            announced => {
                if announced.is_some() {
                    debug!(
                        url = url,
                        expected = expected_content_type,
                        "Origin mislabelled manifest content type, overriding"
                    );
                }
                expected_content_type.to_string()
            }
        };

        Ok((body, content_type))
    }
}
