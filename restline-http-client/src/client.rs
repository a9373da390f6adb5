//! HTTP client implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::json::{JsonOptions, to_json_string};
use crate::response::{InternalError, NoErrorPayload, ResponseStatus, body_text, decode_json};
use crate::{
    ClientConfig, HttpClientError, PreparedRequest, RawResponse, ReqwestTransport, RequestMethod,
    Response, Result, Transport,
};

/// REST client bound to one destination URL.
///
/// Every request method returns a [`Response`]; failures never escape as
/// errors. The type parameter `E` is the error payload type: when set with
/// [`Client::with_error_payload`], bodies of failed responses are decoded
/// into it.
pub struct Client<E = NoErrorPayload> {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cancel: Option<CancellationToken>,
    decode_error_payload: bool,
    _payload: PhantomData<fn() -> E>,
}

impl Client {
    /// Create a client sending over `reqwest`, configured from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client for `url` with default configuration.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(url))
    }

    /// Create a client sending over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            cancel: None,
            decode_error_payload: false,
            _payload: PhantomData,
        }
    }
}

impl<E> Client<E> {
    /// Decode failure bodies into `T`.
    pub fn with_error_payload<T: DeserializeOwned>(self) -> Client<T> {
        Client {
            config: self.config,
            transport: self.transport,
            cancel: self.cancel,
            decode_error_payload: true,
            _payload: PhantomData,
        }
    }

    /// Abort in-flight sends and retry sleeps when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Point the client at a different URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.config.url = url.into();
    }

    /// Replace the caller-supplied headers.
    pub fn set_headers(&mut self, headers: http::HeaderMap) {
        self.config.headers = Some(headers);
    }
}

impl<E: DeserializeOwned> Client<E> {
    /// Issue a GET request.
    pub async fn get(&self) -> Response<E> {
        self.execute(RequestMethod::Get, None).await
    }

    /// POST `text` verbatim.
    pub async fn post_text(&self, text: impl AsRef<str>) -> Response<E> {
        self.execute(RequestMethod::Post, Some(text.as_ref())).await
    }

    /// POST `body` as JSON, dropping null members.
    pub async fn post<T>(&self, body: &T) -> Response<E>
    where
        T: ?Sized + Serialize,
    {
        self.post_with(body, JsonOptions::default()).await
    }

    /// POST `body` as JSON encoded with `options`.
    pub async fn post_with<T>(&self, body: &T, options: JsonOptions) -> Response<E>
    where
        T: ?Sized + Serialize,
    {
        self.execute_json(RequestMethod::Post, body, &options).await
    }

    /// PUT `text` verbatim.
    pub async fn put_text(&self, text: impl AsRef<str>) -> Response<E> {
        self.execute(RequestMethod::Put, Some(text.as_ref())).await
    }

    /// PUT `body` as JSON, dropping null members.
    pub async fn put<T>(&self, body: &T) -> Response<E>
    where
        T: ?Sized + Serialize,
    {
        self.put_with(body, JsonOptions::default()).await
    }

    /// PUT `body` as JSON encoded with `options`.
    pub async fn put_with<T>(&self, body: &T, options: JsonOptions) -> Response<E>
    where
        T: ?Sized + Serialize,
    {
        self.execute_json(RequestMethod::Put, body, &options).await
    }

    /// Issue a DELETE request.
    pub async fn delete(&self) -> Response<E> {
        self.execute(RequestMethod::Delete, None).await
    }

    async fn execute_json<T>(&self, method: RequestMethod, body: &T, options: &JsonOptions) -> Response<E>
    where
        T: ?Sized + Serialize,
    {
        match to_json_string(body, options) {
            Ok(json) => self.execute(method, Some(&json)).await,
            Err(e) => {
                warn!(method = %method, error = %e, "Failed to serialize JSON body");
                Response::from_error(e)
            }
        }
    }

    /// Execute a request with the configured retry policy.
    async fn execute(&self, method: RequestMethod, body: Option<&str>) -> Response<E> {
        let request = match PreparedRequest::build(&self.config, method, body) {
            Ok(request) => request,
            Err(e) => {
                warn!(method = %method, error = %e, "Request not sent");
                return Response::from_error(e);
            }
        };

        let retry = &self.config.retry;
        let attempts = retry.attempts();
        let mut remaining = attempts;
        let mut attempt = 0;

        while remaining > 0 {
            attempt += 1;
            debug!(
                method = %method,
                url = %request.url(),
                attempt,
                attempts,
                "Sending HTTP request"
            );

            match self.execute_once(&request).await {
                Ok(raw) => {
                    debug!(status = %raw.status, attempt, "Received HTTP response");
                    let content = body_text(&raw.body);
                    return Response::success(raw.status, raw.status_text, content);
                }
                Err(HttpClientError::Cancelled) => {
                    debug!(attempt, "Request cancelled");
                    return Response::from_error(HttpClientError::Cancelled);
                }
                Err(fault) => {
                    remaining -= 1;
                    if remaining == 0 {
                        warn!(
                            method = %method,
                            attempts,
                            error = %fault,
                            "Request failed"
                        );
                        return self.failure(fault);
                    }

                    debug!(attempt, error = %fault, "Retrying request due to error");
                    let delay = retry.delay_before_retry(attempt);
                    if !delay.is_zero() && !self.pause(delay).await {
                        return Response::from_error(HttpClientError::Cancelled);
                    }
                }
            }
        }

        Response::no_response(retry.retry_count)
    }

    /// Send once; 4xx and 5xx responses become protocol faults.
    async fn execute_once(&self, request: &PreparedRequest) -> Result<RawResponse> {
        let raw = match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(HttpClientError::Cancelled),
                    result = self.transport.send(request) => result?,
                }
            }
            None => self.transport.send(request).await?,
        };

        if raw.is_failure() {
            return Err(HttpClientError::protocol(raw.status, raw.body));
        }
        Ok(raw)
    }

    /// Sleep between attempts; `false` if cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep(delay) => true,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    /// Build the error response for a fault that exhausted all attempts.
    fn failure(&self, fault: HttpClientError) -> Response<E> {
        let status = fault
            .status_code()
            .map_or(ResponseStatus::Unused, ResponseStatus::Code);
        let description = fault.to_string();
        Response::failure(status, self.classify(fault), description)
    }

    /// Decode the fault's body into the error payload type when configured.
    fn classify(&self, fault: HttpClientError) -> InternalError<E> {
        if !self.decode_error_payload {
            return InternalError::Fault(fault);
        }
        let text = fault
            .response_body()
            .map(|body| body_text(body))
            .unwrap_or_default();
        match decode_json::<E>(&text) {
            Some(payload) => InternalError::Payload(payload),
            None => InternalError::Fault(fault),
        }
    }
}

impl<E> Clone for Client<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            cancel: self.cancel.clone(),
            decode_error_payload: self.decode_error_payload,
            _payload: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Client<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("cancellable", &self.cancel.is_some())
            .field("decode_error_payload", &self.decode_error_payload)
            .finish_non_exhaustive()
    }
}
