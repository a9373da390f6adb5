//! Integration tests running the client stack against a local mock server.

use restline_http_client::prelude::*;
use restline_http_client::{RedirectResolver, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    message: String,
}

fn client_for(server: &MockServer, route: &str) -> Client {
    let config = ClientConfig::builder()
        .url(format!("{}{}", server.uri(), route))
        .build();
    Client::new(config).unwrap()
}

// =============================================================================
// Client
// =============================================================================

#[tokio::test]
async fn test_get_returns_body_and_sends_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("accept", "application/json"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server, "/users/1").get().await;

    assert!(response.is_success());
    assert_eq!(response.status_code(), Some(StatusCode::OK));
    assert_eq!(response.status_description(), "OK");
    let user: serde_json::Value = response.decode_as().unwrap();
    assert_eq!(user["name"], "ada");
}

#[tokio::test]
async fn test_post_sends_json_without_nulls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({"item": "widget", "quantity": 5})))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({"item": "widget", "quantity": 5, "note": null});
    let response = client_for(&server, "/orders").post(&body).await;

    assert_eq!(response.status_code(), Some(StatusCode::CREATED));
    assert_eq!(response.content(), "created");
}

#[tokio::test]
async fn test_put_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/items/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("updated"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/items/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server, "/items/7");
    assert_eq!(client.put_text("{\"n\":1}").await.content(), "updated");

    let deleted = client.delete().await;
    assert!(deleted.is_success());
    assert_eq!(deleted.status_code(), Some(StatusCode::NO_CONTENT));
    assert!(deleted.content().is_empty());
}

#[tokio::test]
async fn test_retry_recovers_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .url(format!("{}/flaky", server.uri()))
        .retries(3, Duration::from_millis(10))
        .build();
    let response = Client::new(config).unwrap().get().await;

    assert!(response.is_success());
    assert_eq!(response.content(), "recovered");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_keep_last_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .url(format!("{}/down", server.uri()))
        .retries(2, Duration::ZERO)
        .build();
    let response = Client::new(config).unwrap().get().await;

    assert_eq!(response.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(response.content().is_empty());
    let fault = response.fault().unwrap();
    assert!(fault.is_protocol());
    assert_eq!(
        response.status_description(),
        "The remote server returned an error: (500) Internal Server Error."
    );
}

#[tokio::test]
async fn test_error_payload_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": 5, "message": "out of stock"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, "/orders").with_error_payload::<ApiError>();
    let response = client.post(&json!({"item": "widget"})).await;

    assert_eq!(response.status_code(), Some(StatusCode::BAD_REQUEST));
    let payload = response.error_payload().unwrap();
    assert_eq!(payload.code, 5);
    assert_eq!(payload.message, "out of stock");
    assert!(response.fault().is_none());
}

#[tokio::test]
async fn test_timeout_yields_unused_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .url(format!("{}/slow", server.uri()))
        .timeout(Duration::from_millis(100))
        .build();
    let response = Client::new(config).unwrap().get().await;

    assert_eq!(response.status(), ResponseStatus::Unused);
    let fault = response.fault().unwrap();
    assert!(matches!(fault, HttpClientError::Http(_)));
    assert!(fault.is_timeout());
    assert!(!fault.is_configuration());
}

#[tokio::test]
async fn test_basic_credentials_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .url(format!("{}/secure", server.uri()))
        .credentials(Credentials::basic("user", "pass"))
        .build();
    assert!(Client::new(config).unwrap().get().await.is_success());
}

// =============================================================================
// Redirect resolution
// =============================================================================

#[tokio::test]
async fn test_resolver_follows_relative_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/next"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let resolver = RedirectResolver::new().unwrap();
    let resolved = resolver.resolve(&format!("{}/a", server.uri())).await;
    assert_eq!(resolved, format!("{}/next", server.uri()));
}

#[tokio::test]
async fn test_resolver_follows_meta_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta http-equiv="refresh" content="0; url=/final"></head></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let resolver = RedirectResolver::new().unwrap();
    let resolved = resolver.resolve(&format!("{}/landing", server.uri())).await;
    assert_eq!(resolved, format!("{}/final", server.uri()));
}

#[tokio::test]
async fn test_resolver_reports_not_found() {
    let server = MockServer::start().await;

    let resolver = RedirectResolver::new().unwrap();
    let resolved = resolver.resolve(&format!("{}/missing", server.uri())).await;
    assert_eq!(
        resolved,
        "ERROR: The remote server returned an error: (404) Not Found."
    );
}

// =============================================================================
// Cookies
// =============================================================================

#[tokio::test]
async fn test_cookie_client_persists_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "session=abc; Path=/")
                .set_body_string("welcome"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ada"))
        .mount(&server)
        .await;

    let cookies = CookieWebClient::new().unwrap();
    assert_eq!(
        cookies.download_string(&format!("{}/login", server.uri())).await.unwrap(),
        "welcome"
    );
    let base = Url::parse(&server.uri()).unwrap();
    assert_eq!(cookies.cookies(&base).as_deref(), Some("session=abc"));

    let profile = cookies
        .download_data(&format!("{}/profile", server.uri()))
        .await
        .unwrap();
    assert_eq!(&profile[..], b"ada");

    let client = Client::with_transport(
        ClientConfig::new(format!("{}/profile", server.uri())),
        Arc::new(cookies.clone()),
    );
    assert_eq!(client.get().await.content(), "ada");
}

#[tokio::test]
async fn test_cookie_client_upload_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&server)
        .await;

    let cookies = CookieWebClient::new().unwrap();
    let stored = cookies
        .upload_string(&format!("{}/notes", server.uri()), RequestMethod::Put, "hello")
        .await
        .unwrap();
    assert_eq!(stored, "stored");

    let err = cookies
        .download_string(&format!("{}/nothing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
}
