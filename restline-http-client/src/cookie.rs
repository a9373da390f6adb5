//! Web client that keeps cookies across requests.

use crate::response::body_text;
use crate::transport::{client_builder, dispatch};
use crate::{ClientConfig, HttpClientError, PreparedRequest, RawResponse, RequestMethod, Result, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A web client owning a cookie container.
///
/// Cookies set by any response are sent back on later requests to matching
/// URLs, including requests issued by a [`Client`](crate::Client) that uses
/// this as its transport. Clones share the same container.
#[derive(Debug, Clone)]
pub struct CookieWebClient {
    inner: reqwest::Client,
    jar: Arc<Jar>,
}

impl CookieWebClient {
    /// Create a cookie client with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a cookie client with the transport settings of `config`.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let inner = client_builder(config)?
            .cookie_provider(jar.clone())
            .build()?;
        Ok(Self { inner, jar })
    }

    /// The shared cookie container.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Store a `Set-Cookie` style cookie for `url`.
    pub fn add_cookie(&self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }

    /// The `Cookie` header that would be sent to `url`.
    pub fn cookies(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    /// GET `url` and return the body as text.
    pub async fn download_string(&self, url: &str) -> Result<String> {
        let response = self.exchange(RequestMethod::Get, url, None).await?;
        Ok(body_text(&response.body))
    }

    /// GET `url` and return the raw body.
    pub async fn download_data(&self, url: &str) -> Result<Bytes> {
        let response = self.exchange(RequestMethod::Get, url, None).await?;
        Ok(response.body)
    }

    /// Send `data` to `url` with `method` and return the response text.
    pub async fn upload_string(&self, url: &str, method: RequestMethod, data: &str) -> Result<String> {
        let response = self.exchange(method, url, Some(data)).await?;
        Ok(body_text(&response.body))
    }

    async fn exchange(&self, method: RequestMethod, url: &str, data: Option<&str>) -> Result<RawResponse> {
        let target = Url::parse(url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
        let mut request = PreparedRequest::new(method, target);
        if let Some(data) = data {
            request.set_body(data);
        }

        let response = dispatch(&self.inner, &request).await?;
        debug!(
            method = %method,
            url = %response.url,
            status = response.status.as_u16(),
            "Cookie client exchange complete"
        );
        if response.is_failure() {
            return Err(HttpClientError::protocol(response.status, response.body));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for CookieWebClient {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse> {
        dispatch(&self.inner, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_cookies_are_scoped_to_domain() {
        let client = CookieWebClient::new().unwrap();
        let home = Url::parse("https://example.com/").unwrap();
        client.add_cookie("session=abc; Path=/", &home);

        assert_eq!(client.cookies(&home).as_deref(), Some("session=abc"));
        let nested = Url::parse("https://example.com/account/settings").unwrap();
        assert_eq!(client.cookies(&nested).as_deref(), Some("session=abc"));
        let other = Url::parse("https://other.example/").unwrap();
        assert!(client.cookies(&other).is_none());
    }

    #[test]
    fn test_clones_share_jar() {
        let client = CookieWebClient::new().unwrap();
        let clone = client.clone();
        let url = Url::parse("https://example.com/").unwrap();
        clone.add_cookie("theme=dark", &url);

        assert_eq!(client.cookies(&url).as_deref(), Some("theme=dark"));
        assert!(Arc::ptr_eq(&client.cookie_jar(), &clone.cookie_jar()));
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let client = CookieWebClient::new().unwrap();
        let err = tokio_test::block_on(client.download_string("no scheme here")).unwrap_err();
        assert!(err.is_configuration());
    }
}
