//! Response envelope returned by every client call.

use crate::HttpClientError;
use http::StatusCode;
use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};
use std::fmt;
use tracing::debug;

/// Status of a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// No protocol status applies: the request was never sent, or no
    /// response was obtained.
    Unused,
    /// Status received from the server, or synthesized by the pipeline.
    Code(StatusCode),
}

impl ResponseStatus {
    /// The status code, unless this is [`ResponseStatus::Unused`].
    pub fn code(self) -> Option<StatusCode> {
        match self {
            Self::Unused => None,
            Self::Code(code) => Some(code),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unused => f.write_str("Unused"),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}

/// Marker for clients without an error payload type.
///
/// It has no values, so a `Response<NoErrorPayload>` can only ever carry a
/// raw fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoErrorPayload {}

impl<'de> Deserialize<'de> for NoErrorPayload {
    fn deserialize<D>(_deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Err(de::Error::custom("no error payload type configured"))
    }
}

/// Why a call did not succeed.
#[derive(Debug)]
pub enum InternalError<E = NoErrorPayload> {
    /// The captured fault.
    Fault(HttpClientError),
    /// A failure body decoded into the client's error payload type.
    Payload(E),
}

impl<E> InternalError<E> {
    /// The captured fault, if the failure body was not decoded.
    pub fn as_fault(&self) -> Option<&HttpClientError> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Payload(_) => None,
        }
    }

    /// The decoded error payload, if any.
    pub fn as_payload(&self) -> Option<&E> {
        match self {
            Self::Fault(_) => None,
            Self::Payload(payload) => Some(payload),
        }
    }
}

/// Normalized outcome of a request.
///
/// Calls on [`Client`](crate::Client) always produce one of these: failures
/// are recorded in [`Response::internal_error`] rather than returned as
/// errors.
#[derive(Debug)]
pub struct Response<E = NoErrorPayload> {
    status: ResponseStatus,
    status_description: String,
    content: String,
    internal_error: Option<InternalError<E>>,
}

impl<E> Response<E> {
    /// A successful response.
    pub(crate) fn success(status: StatusCode, status_description: String, content: String) -> Self {
        Self {
            status: ResponseStatus::Code(status),
            status_description,
            content,
            internal_error: None,
        }
    }

    /// A failed response with the best known status.
    pub(crate) fn failure(status: ResponseStatus, error: InternalError<E>, description: String) -> Self {
        Self {
            status,
            status_description: description,
            content: String::new(),
            internal_error: Some(error),
        }
    }

    /// A failure detected before or instead of any protocol exchange.
    pub(crate) fn from_error(error: HttpClientError) -> Self {
        let description = error.to_string();
        Self::failure(ResponseStatus::Unused, InternalError::Fault(error), description)
    }

    /// Fallback when no response could be obtained at all.
    pub(crate) fn no_response(retry_count: u32) -> Self {
        Self {
            status: ResponseStatus::Code(StatusCode::REQUEST_TIMEOUT),
            status_description: format!(
                "No response could be retrieved from destination after {retry_count} retries"
            ),
            content: String::new(),
            internal_error: None,
        }
    }

    /// Response status.
    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// Status code, unless the status is [`ResponseStatus::Unused`].
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status.code()
    }

    /// Human readable status text.
    pub fn status_description(&self) -> &str {
        &self.status_description
    }

    /// Raw body text; empty on failure or when the body was not valid UTF-8.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume the response and return the body text.
    pub fn into_content(self) -> String {
        self.content
    }

    /// Why the call failed, if it did.
    pub fn internal_error(&self) -> Option<&InternalError<E>> {
        self.internal_error.as_ref()
    }

    /// Consume the response and return the internal error.
    pub fn into_internal_error(self) -> Option<InternalError<E>> {
        self.internal_error
    }

    /// The captured fault, if the failure was not decoded into a payload.
    pub fn fault(&self) -> Option<&HttpClientError> {
        self.internal_error.as_ref().and_then(InternalError::as_fault)
    }

    /// The decoded error payload, if any.
    pub fn error_payload(&self) -> Option<&E> {
        self.internal_error.as_ref().and_then(InternalError::as_payload)
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.internal_error.is_none()
            && self.status_code().is_some_and(|code| code.is_success())
    }

    /// Decode the body as JSON into `T`.
    ///
    /// Returns `None` when the body is blank or does not decode.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Option<T> {
        decode_json(&self.content)
    }
}

/// Body bytes as text; anything that is not valid UTF-8 yields an empty
/// string.
pub(crate) fn body_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_owned(),
        Err(e) => {
            debug!(error = %e, "Response body is not valid UTF-8; discarding");
            String::new()
        }
    }
}

/// JSON decode of non-blank text, with failures mapped to `None`.
pub(crate) fn decode_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text)
        .inspect_err(|e| debug!(error = %e, "Failed to decode JSON body"))
        .ok()
}
