//! HTTP client error types.

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// HTTP client errors.
///
/// These are never returned from the request entry points of
/// [`Client`](crate::Client); they are captured inside the
/// [`Response`](crate::Response) envelope instead.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The configured URL is empty or whitespace.
    #[error("URL empty")]
    EmptyUrl,

    /// The configured URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A configuration value could not be interpreted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request body could not be serialized.
    #[error("JSON Serialization Error: {0}")]
    Serialization(String),

    /// Connection-level failure reported by a transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A response was received with a 4xx or 5xx status.
    #[error("{message}")]
    Protocol {
        /// HTTP status code.
        status: StatusCode,
        /// Human readable description of the failure.
        message: String,
        /// Raw body returned by the server.
        body: Bytes,
    },

    /// The request was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,

    /// Redirect resolution gave up after too many hops.
    #[error("Too many redirects: gave up after {hops} hops")]
    TooManyRedirects {
        /// Number of hops followed.
        hops: usize,
    },

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl HttpClientError {
    /// Build a protocol error for a received non-success response.
    pub fn protocol(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        Self::Protocol {
            status,
            message: format!(
                "The remote server returned an error: ({}) {}.",
                status.as_u16(),
                reason
            ),
            body: body.into(),
        }
    }

    /// Check if this error was detected before any network call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyUrl
                | Self::InvalidUrl(_)
                | Self::InvalidConfig(_)
                | Self::Serialization(_)
                | Self::UrlParse(_)
        )
    }

    /// Check if a response was obtained with a failing status.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Check if the transport gave up waiting for the server.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }

    /// Get the HTTP status code if a response was received.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Body of the response associated with this error, if any.
    pub fn response_body(&self) -> Option<&Bytes> {
        match self {
            Self::Protocol { body, .. } => Some(body),
            _ => None,
        }
    }
}
