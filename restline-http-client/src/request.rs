//! Request descriptor assembled from client configuration.

use crate::{ClientConfig, HttpClientError, RequestMethod, Result};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::borrow::Cow;
use tracing::warn;
use url::Url;

/// Longest URL the client will send.
pub const MAX_URL_LENGTH: usize = 2000;

/// URL-encoded comma; truncation never leaves a partial list item behind it.
const ENCODED_COMMA: &str = "%2C";

/// An immutable, ready-to-send request.
///
/// Built fresh for every call from the client's configuration, so nothing a
/// call does (URL truncation included) leaks back into the configuration.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: RequestMethod,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl PreparedRequest {
    /// A bare request without configuration-derived headers.
    pub fn new(method: RequestMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Build the request for `method` from `config`.
    ///
    /// `body` is only attached for verbs that carry one.
    pub fn build(config: &ClientConfig, method: RequestMethod, body: Option<&str>) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(HttpClientError::EmptyUrl);
        }

        let mut url = parse_url(&config.url)?;
        if let Cow::Owned(truncated) = truncate_url(url.as_str()) {
            warn!(
                original_length = url.as_str().len(),
                truncated_length = truncated.len(),
                "URL exceeds {} characters; truncated for this request",
                MAX_URL_LENGTH
            );
            url = parse_url(&truncated)?;
        }

        let mut headers = config.headers.clone().unwrap_or_default();
        insert_default(&mut headers, header::ACCEPT, &config.accept)?;
        insert_default(&mut headers, header::CONTENT_TYPE, &config.content_type)?;
        insert_default(&mut headers, header::USER_AGENT, &config.user_agent)?;

        if let Some(credentials) = &config.credentials {
            headers.insert(
                header::AUTHORIZATION,
                header_value(&header::AUTHORIZATION, &credentials.authorization())?,
            );
        }
        if let Some(policy) = config.cache_policy {
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(policy.cache_control()),
            );
            if policy.sends_pragma() {
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            }
        }
        if !config.keep_alive {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        if config.gzip {
            headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        }

        let body = method
            .has_body()
            .then(|| body.unwrap_or_default().to_owned());

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }

    /// Request verb.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// Target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Body text, present for POST and PUT.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }
}

/// Cut `url` down to [`MAX_URL_LENGTH`] characters.
///
/// Requests apply this to the normalized URL, so the limit holds for what
/// goes on the wire.
///
/// When the cut-down URL still contains an encoded comma it is shortened
/// further to end just before the last one, so a comma separated list in
/// the query string loses its trailing, possibly partial, item.
pub fn truncate_url(url: &str) -> Cow<'_, str> {
    let Some((end, _)) = url.char_indices().nth(MAX_URL_LENGTH) else {
        return Cow::Borrowed(url);
    };
    let truncated = &url[..end];
    match truncated.rfind(ENCODED_COMMA) {
        Some(comma) => Cow::Owned(truncated[..comma].to_owned()),
        None => Cow::Owned(truncated.to_owned()),
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))
}

fn insert_default(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    if value.is_empty() || headers.contains_key(&name) {
        return Ok(());
    }
    let value = header_value(&name, value)?;
    headers.insert(name, value);
    Ok(())
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| HttpClientError::InvalidConfig(format!("{name}: {e}")))
}
