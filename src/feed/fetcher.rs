use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::util::{validate_url, HostPolicy, UrlValidationError};

pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Redirect hops followed before a fetch fails.
pub const MAX_REDIRECTS: usize = 10;

/// Errors that can occur while retrieving a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL is unparseable, not HTTP(S), or blocked by the host policy
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, body read, refused redirect)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Why a redirect was not followed.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("Too many redirects (max {0})")]
    TooMany(usize),
    #[error("Redirect loop detected at {0}")]
    Loop(String),
    #[error("Redirect target rejected: {0}")]
    Blocked(#[from] UrlValidationError),
}

/// Per-request limits applied by [`fetch_feed`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Deadline for the whole request including the body; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Maximum accepted body size in bytes.
    pub max_size: usize,
    pub host_policy: HostPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_size: DEFAULT_MAX_FEED_SIZE,
            host_policy: HostPolicy::AllowAll,
        }
    }
}

/// Builds the HTTP client shared by all fetches of a run.
///
/// Every redirect target is checked against `host_policy`, so a public feed
/// cannot bounce the request to a host the policy rejects.
pub fn build_client(
    user_agent: &str,
    host_policy: HostPolicy,
) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(redirect_policy(host_policy))
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

/// Redirect policy with a hop limit, loop detection and per-hop URL checks.
fn redirect_policy(host_policy: HostPolicy) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous(), host_policy) {
            Ok(()) => {
                tracing::debug!(
                    from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
                    to = %attempt.url(),
                    hop = attempt.previous().len(),
                    "Following redirect"
                );
                attempt.follow()
            }
            Err(e) => {
                tracing::warn!(to = %attempt.url(), error = %e, "Refusing redirect");
                attempt.error(e)
            }
        }
    })
}

/// Decides whether the redirect to `next` may be followed.
///
/// `previous` holds the URLs already requested, the original one first.
fn check_redirect(next: &Url, previous: &[Url], policy: HostPolicy) -> Result<(), RedirectError> {
    if previous.len() > MAX_REDIRECTS {
        return Err(RedirectError::TooMany(MAX_REDIRECTS));
    }

    if previous.iter().any(|prev| prev.as_str() == next.as_str()) {
        return Err(RedirectError::Loop(next.to_string()));
    }

    validate_url(next.as_str(), policy)?;
    Ok(())
}

/// Fetches a feed document with a single HTTP GET.
///
/// The whole body is read into memory. The response, and with it the
/// connection, is released when this function returns, whether it succeeds
/// or fails.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - URL rejected before any request is made
/// - [`FetchError::Network`] - Connection, TLS or body read errors, and
///   redirects refused by the client built with [`build_client`]
/// - [`FetchError::HttpStatus`] - Any non-2xx response
/// - [`FetchError::Timeout`] - `options.timeout` elapsed
/// - [`FetchError::ResponseTooLarge`] - Body exceeded `options.max_size`
/// - [`FetchError::IncompleteResponse`] - Body shorter than Content-Length
///
/// No retries are attempted.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<Vec<u8>, FetchError> {
    let url = validate_url(url, options.host_policy)?;
    let request = get_body(client, url, options.max_size);

    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => request.await,
    }
}

async fn get_body(
    client: &reqwest::Client,
    url: url::Url,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    tracing::debug!(url = %url, "Fetching feed");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    read_limited_bytes(response, limit).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::with_capacity(expected_length.unwrap_or(0) as usize);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
