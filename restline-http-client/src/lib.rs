//! # Restline HTTP Client
//!
//! A REST client helper that never fails across its public surface: every
//! call returns a [`Response`] envelope carrying the status, the body text
//! and, when something went wrong, the captured fault or a decoded error
//! payload.
//!
//! ## Features
//!
//! - **Verbs**: GET, POST, PUT and DELETE against a configured URL
//! - **JSON Bodies**: serde encoding with a null policy and a nesting guard
//! - **Retries**: bounded attempts with optional delay between them
//! - **Error Payloads**: failure bodies decoded into a caller-chosen type
//! - **Redirect Resolution**: follow redirects and meta-refresh tags to a final URL
//! - **Cookies**: a web client that keeps cookies across requests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restline_http_client::{Client, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .url("https://api.example.com/users/1")
//!         .retries(3, Duration::from_millis(250))
//!         .build();
//!     let client = Client::new(config)?;
//!
//!     let response = client.get().await;
//!     println!("Status: {}", response.status());
//!     println!("Body: {}", response.content());
//!     Ok(())
//! }
//! ```
//!
//! ## Typed Error Payloads
//!
//! ```rust,no_run
//! use restline_http_client::{Client, ClientConfig};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct ApiError {
//!     code: u32,
//!     message: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new("https://api.example.com/orders"))?
//!         .with_error_payload::<ApiError>();
//!
//!     let response = client.post(&serde_json::json!({"item": "widget"})).await;
//!     if let Some(error) = response.error_payload() {
//!         eprintln!("rejected with {}: {}", error.code, error.message);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod cookie;
mod error;
mod json;
mod method;
mod redirect;
mod request;
mod response;
mod retry;
mod transport;

pub use client::Client;
pub use config::{CachePolicy, ClientConfig, ClientConfigBuilder, Credentials};
pub use cookie::CookieWebClient;
pub use error::{HttpClientError, Result};
pub use json::{JsonOptions, to_json_string, to_json_value};
pub use method::RequestMethod;
pub use redirect::{DEFAULT_MAX_HOPS, REDIRECT_TIMEOUT, RedirectResolver, meta_refresh_target};
pub use request::{MAX_URL_LENGTH, PreparedRequest, truncate_url};
pub use response::{InternalError, NoErrorPayload, Response, ResponseStatus};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use transport::{RawResponse, ReqwestTransport, Transport};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, StatusCode, header};
pub use tokio_util::sync::CancellationToken;
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use restline_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::config::{CachePolicy, ClientConfig, ClientConfigBuilder, Credentials};
    pub use crate::cookie::CookieWebClient;
    pub use crate::error::{HttpClientError, Result};
    pub use crate::json::JsonOptions;
    pub use crate::method::RequestMethod;
    pub use crate::redirect::RedirectResolver;
    pub use crate::response::{InternalError, Response, ResponseStatus};
    pub use crate::retry::{BackoffStrategy, RetryPolicy};
    pub use crate::transport::Transport;
    pub use http::{HeaderMap, HeaderValue, StatusCode, header};
}
