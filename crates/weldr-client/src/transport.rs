//! Single-round-trip HTTP transport.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Path segments every API route starts with.
pub const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Request body attached to a [`Transport::send`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// Pre-encoded JSON document, sent with `Content-Type: application/json`.
    Json(Vec<u8>),
}

impl RequestBody {
    /// Encode a serializable value as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if the value cannot be serialized.
    pub fn json<T: serde::Serialize>(route: &str, value: &T) -> ClientResult<Self> {
        serde_json::to_vec(value)
            .map(Self::Json)
            .map_err(|source| ClientError::Decode {
                route: route.to_string(),
                source,
            })
    }
}

/// Performs exactly one HTTP request per call against the API server.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
}

impl Transport {
    /// Wrap a configured HTTP client and the server's base URL.
    #[must_use]
    pub const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL for an API route.
    ///
    /// `segments` are appended after `/api/v1`, each percent-encoded as a
    /// single path segment; any path already on the base URL is kept.
    /// `query` pairs are appended only when non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when the base URL cannot carry
    /// a path (e.g. `mailto:`).
    pub fn route_url(&self, segments: &[&str], query: &[(&str, String)]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ClientError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                })?;
            path.pop_if_empty();
            path.extend(API_PREFIX);
            path.extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send one request and return the raw response.
    ///
    /// Non-2xx statuses are not errors at this layer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] on connection, TLS or timeout
    /// failures.
    pub async fn send(&self, method: Method, url: Url, body: RequestBody) -> ClientResult<RawResponse> {
        let route = url.path().to_string();
        debug!(%method, route = %route, "sending request");

        let mut request = self.client.request(method, url);
        if let RequestBody::Json(bytes) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                route: route.clone(),
                source,
            })?;
        debug!(route = %route, status = %response.status(), "response received");
        Ok(RawResponse {
            route,
            inner: response,
        })
    }
}

/// Raw server response: status, headers and an unread body.
///
/// Dropping the value releases the connection.
#[derive(Debug)]
pub struct RawResponse {
    route: String,
    inner: reqwest::Response,
}

impl RawResponse {
    /// Route path the response belongs to.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the body cannot be read.
    pub async fn bytes(self) -> ClientResult<Vec<u8>> {
        let route = self.route;
        self.inner
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| ClientError::Transport { route, source })
    }

    /// Hand out the underlying response for streaming reads.
    #[must_use]
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}
