//! Client configuration.

use crate::retry::RetryPolicy;
use crate::{HttpClientError, Result};
use base64::Engine;
use http::HeaderMap;
use std::env;
use std::time::Duration;

/// Default `Content-Type` sent with every request.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Default `Accept` sent with every request.
pub const DEFAULT_ACCEPT: &str = "application/json";

/// Client configuration for one logical destination.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target URL.
    pub url: String,
    /// Credentials attached to every request.
    pub credentials: Option<Credentials>,
    /// Caller-supplied headers, used verbatim.
    pub headers: Option<HeaderMap>,
    /// `Content-Type` header value.
    pub content_type: String,
    /// `Accept` header value.
    pub accept: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Reuse connections between requests.
    pub keep_alive: bool,
    /// Proxy URL applied to all schemes.
    pub proxy: Option<String>,
    /// Cache directives sent with every request.
    pub cache_policy: Option<CachePolicy>,
    /// Negotiate gzip and decompress gzip/deflate responses.
    pub gzip: bool,
    /// Follow redirects transparently.
    pub follow_redirects: bool,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            credentials: None,
            headers: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            user_agent: format!("Restline/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(100),
            retry: RetryPolicy::default(),
            keep_alive: true,
            proxy: None,
            cache_policy: None,
            gzip: true,
            follow_redirects: true,
            max_redirects: 50,
        }
    }
}

impl ClientConfig {
    /// Configuration for `url` with every other setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// With prefix `API`, the recognised variables are `API_URL`,
    /// `API_TIMEOUT_MS`, `API_RETRY_COUNT`, `API_RETRY_DELAY_MS`,
    /// `API_USER_AGENT`, `API_GZIP`, `API_KEEP_ALIVE` and `API_PROXY`.
    /// Unset variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let var = |key: &str| env::var(format!("{}_{}", prefix, key)).ok();
        let mut config = Self::default();

        if let Some(url) = var("URL") {
            config.url = url;
        }
        if let Some(timeout) = var("TIMEOUT_MS") {
            config.timeout = Duration::from_millis(parse_var("TIMEOUT_MS", &timeout)?);
        }
        let retry_count = var("RETRY_COUNT")
            .map(|v| parse_var("RETRY_COUNT", &v))
            .transpose()?
            .unwrap_or(config.retry.retry_count);
        let retry_delay = var("RETRY_DELAY_MS")
            .map(|v| parse_var("RETRY_DELAY_MS", &v))
            .transpose()?
            .unwrap_or(0);
        config.retry = RetryPolicy::fixed(retry_count, Duration::from_millis(retry_delay));
        if let Some(user_agent) = var("USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(gzip) = var("GZIP") {
            config.gzip = parse_flag("GZIP", &gzip)?;
        }
        if let Some(keep_alive) = var("KEEP_ALIVE") {
            config.keep_alive = parse_flag("KEEP_ALIVE", &keep_alive)?;
        }
        config.proxy = var("PROXY").filter(|p| !p.trim().is_empty());

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HttpClientError::InvalidConfig(format!("{key}={value}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HttpClientError::InvalidConfig(format!("{key}={value}"))),
    }
}

/// Credentials passed through to the server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Optional password.
        password: Option<String>,
    },
    /// Bearer token authentication.
    Bearer(String),
}

impl Credentials {
    /// Basic credentials with a password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    /// Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Value of the `Authorization` header for these credentials.
    pub fn authorization(&self) -> String {
        match self {
            Self::Basic { username, password } => {
                let raw = format!("{}:{}", username, password.as_deref().unwrap_or(""));
                let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
                format!("Basic {encoded}")
            }
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Caching behaviour requested from intermediaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always go to the origin server.
    BypassCache,
    /// Serve from cache only.
    CacheOnly,
    /// Accept a cached copy, even a stale one.
    CacheIfAvailable,
    /// Revalidate cached copies with the origin.
    Revalidate,
    /// Reload from the origin and refresh caches.
    Reload,
    /// Do not cache the request or response anywhere.
    NoCacheNoStore,
}

impl CachePolicy {
    /// Value of the `Cache-Control` header.
    pub fn cache_control(self) -> &'static str {
        match self {
            Self::BypassCache | Self::Reload => "no-cache",
            Self::CacheOnly => "only-if-cached",
            Self::CacheIfAvailable => "max-stale",
            Self::Revalidate => "max-age=0",
            Self::NoCacheNoStore => "no-cache, no-store",
        }
    }

    /// Whether a legacy `Pragma: no-cache` header is sent as well.
    pub fn sends_pragma(self) -> bool {
        matches!(self, Self::BypassCache | Self::Reload | Self::NoCacheNoStore)
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the target URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    /// Use `headers` verbatim for every request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = Some(headers);
        self
    }

    /// Set the `Content-Type` header value.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.content_type = content_type.into();
        self
    }

    /// Set the `Accept` header value.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the number of attempts and the sleep between them.
    pub fn retries(mut self, retry_count: u32, sleep_between: Duration) -> Self {
        self.config.retry = RetryPolicy::fixed(retry_count, sleep_between);
        self
    }

    /// Enable or disable connection reuse.
    pub fn keep_alive(mut self, enable: bool) -> Self {
        self.config.keep_alive = enable;
        self
    }

    /// Route all requests through a proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Set the cache policy.
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.config.cache_policy = Some(policy);
        self
    }

    /// Enable or disable gzip negotiation.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Enable or disable following redirects.
    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.config.follow_redirects = enable;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
