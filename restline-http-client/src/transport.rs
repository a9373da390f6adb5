//! Transport seam between the execute pipeline and the network.

use crate::{ClientConfig, PreparedRequest, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tracing::debug;
use url::Url;

/// A response as handed back by a [`Transport`].
///
/// The body is read in full before the transport returns, so the underlying
/// connection is released on every path.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code.
    pub status: StatusCode,
    /// Human readable status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Effective URL the response came from.
    pub url: Url,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// An empty response with the canonical status text.
    pub fn new(status: StatusCode, url: Url) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers: HeaderMap::new(),
            url,
            body: Bytes::new(),
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::try_from(name),
            http::HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the status is a client or server error.
    pub fn is_failure(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Read a reqwest response to completion.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await.unwrap_or_else(|e| {
            debug!(error = %e, "Failed to read response body");
            Bytes::new()
        });

        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            url,
            body,
        }
    }
}

/// Sends prepared requests.
///
/// Implementations report responses of any status as `Ok`; only failures to
/// obtain a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and read the whole response.
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport configured from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            inner: client_builder(config)?.build()?,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse> {
        dispatch(&self.inner, request).await
    }
}

/// Reqwest builder carrying the transport-level settings of `config`.
pub(crate) fn client_builder(config: &ClientConfig) -> Result<reqwest::ClientBuilder> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .gzip(config.gzip)
        .deflate(config.gzip);

    if !config.timeout.is_zero() {
        builder = builder.timeout(config.timeout);
    }
    if !config.keep_alive {
        builder = builder.pool_max_idle_per_host(0);
    }
    if config.follow_redirects {
        builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
    } else {
        builder = builder.redirect(reqwest::redirect::Policy::none());
    }
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }

    Ok(builder)
}

/// Send `request` through `client` and read the response.
pub(crate) async fn dispatch(client: &reqwest::Client, request: &PreparedRequest) -> Result<RawResponse> {
    let mut builder = client
        .request(request.method().into(), request.url().clone())
        .headers(request.headers().clone());

    if let Some(body) = request.body() {
        builder = builder.body(body.to_owned());
    }

    let response = builder.send().await?;
    Ok(RawResponse::from_reqwest(response).await)
}
