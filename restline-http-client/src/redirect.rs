//! Final-URL resolution through HTTP redirects and meta-refresh pages.

use crate::{
    ClientConfig, HttpClientError, PreparedRequest, RequestMethod, ReqwestTransport, Result,
    Transport,
};
use http::StatusCode;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout applied to every hop.
pub const REDIRECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on the number of hops followed.
pub const DEFAULT_MAX_HOPS: usize = 10;

static META_REFRESH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)http-equiv\W*refresh.+?url\W+?(.+)").expect("meta refresh pattern is valid")
});

/// Follows redirects one hop at a time to find where a URL ends up.
///
/// Each hop is a GET with automatic redirects disabled. A 301, 302, 303,
/// 307 or 308 response moves on to its `Location`; any other response is
/// searched for an HTML meta-refresh tag. Relative targets are resolved
/// against the URL the response came from.
pub struct RedirectResolver {
    transport: Arc<dyn Transport>,
    max_hops: usize,
}

impl RedirectResolver {
    /// Create a resolver sending over `reqwest` with a 10 second timeout.
    pub fn new() -> Result<Self> {
        let config = ClientConfig::builder()
            .timeout(REDIRECT_TIMEOUT)
            .follow_redirects(false)
            .build();
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(&config)?)))
    }

    /// Create a resolver sending over a custom transport.
    ///
    /// The transport must not follow redirects itself.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Set the maximum number of hops to follow.
    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Resolve `url` to its final destination.
    ///
    /// Failures come back as strings starting with `"ERROR: "`: the fault
    /// message for a 404 or too many hops, `"ERROR: Connection failure"`
    /// for anything else. Use [`RedirectResolver::try_resolve`] for a typed
    /// error.
    pub async fn resolve(&self, url: &str) -> String {
        match self.try_resolve(url).await {
            Ok(resolved) => resolved,
            Err(e @ HttpClientError::TooManyRedirects { .. }) => format!("ERROR: {e}"),
            Err(e) if e.status_code() == Some(StatusCode::NOT_FOUND) => format!("ERROR: {e}"),
            Err(e) => {
                debug!(url, error = %e, "Redirect resolution failed");
                "ERROR: Connection failure".to_owned()
            }
        }
    }

    /// Resolve `url` to its final destination.
    pub async fn try_resolve(&self, url: &str) -> Result<String> {
        let mut current = url.to_owned();
        let mut hops = 0;

        loop {
            let Some(next) = self.next_hop(&current).await? else {
                return Ok(current);
            };
            if next == current {
                return Ok(next);
            }
            if hops == self.max_hops {
                return Err(HttpClientError::TooManyRedirects { hops });
            }
            hops += 1;
            debug!(from = %current, to = %next, hops, "Following redirect");
            current = next;
        }
    }

    /// Where `url` points next, if anywhere.
    async fn next_hop(&self, url: &str) -> Result<Option<String>> {
        let target = Url::parse(url)?;
        let request = PreparedRequest::new(RequestMethod::Get, target);
        let response = self.transport.send(&request).await?;

        if response.is_failure() {
            return Err(HttpClientError::protocol(response.status, response.body));
        }

        if is_redirect(response.status) {
            let location = response.header(http::header::LOCATION).unwrap_or_default().trim();
            if location.is_empty() {
                return Ok(None);
            }
            return absolutize(&response.url, location).map(Some);
        }

        let text = String::from_utf8_lossy(&response.body);
        match meta_refresh_target(&text) {
            Some(target) if !target.is_empty() => absolutize(&response.url, &target).map(Some),
            _ => Ok(None),
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// `location` as an absolute URL, resolving relative references against `base`.
fn absolutize(base: &Url, location: &str) -> Result<String> {
    match Url::parse(location) {
        Ok(_) => Ok(location.to_owned()),
        Err(_) => Ok(base.join(location)?.into()),
    }
}

/// URL named by the first meta-refresh tag in `html`.
///
/// The value runs from `url=` to the closing quote or `>`.
pub fn meta_refresh_target(html: &str) -> Option<String> {
    let found = META_REFRESH.find(html)?.as_str();
    let start = found.to_ascii_lowercase().find("url=")? + "url=".len();
    let rest = &found[start..];
    let end = rest.find('>')?;
    let value = rest[..end].trim().trim_start_matches(['"', '\'']);
    let value = value
        .find(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        .map_or(value, |stop| &value[..stop]);
    Some(value.to_owned())
}
