//! Integration tests for common Restline workflows.
//!
//! These tests verify that the most common use cases work correctly.

use restline::prelude::*;
use restline::{JsonOptions, MAX_URL_LENGTH, NoErrorPayload, Url, truncate_url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = ClientConfig::default();
    assert!(config.url.is_empty());
    assert_eq!(config.content_type, "application/json; charset=utf-8");
    assert_eq!(config.accept, "application/json");
    assert_eq!(config.retry.attempts(), 1);
    assert!(config.keep_alive);
    assert!(config.gzip);
    assert!(config.proxy.is_none());
}

#[test]
fn test_config_builder() {
    let config = ClientConfig::builder()
        .url("https://api.example.com")
        .timeout(Duration::from_secs(5))
        .retries(4, Duration::from_millis(50))
        .credentials(Credentials::bearer("token"))
        .cache_policy(CachePolicy::NoCacheNoStore)
        .keep_alive(false)
        .build();

    assert_eq!(config.url, "https://api.example.com");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.retry.retry_count, 4);
    assert_eq!(config.retry.delay_before_retry(1), Duration::from_millis(50));
    assert!(!config.keep_alive);
}

// =============================================================================
// Envelope Tests
// =============================================================================

#[test]
fn test_empty_url_never_reaches_network() {
    let client = Client::from_url("   ").unwrap();
    let response = tokio_test::block_on(client.get());

    assert_eq!(response.status(), ResponseStatus::Unused);
    assert!(response.fault().unwrap().is_configuration());
    assert_eq!(response.status_description(), "URL empty");
}

#[tokio::test]
async fn test_excessive_nesting_rejected_before_send() {
    #[derive(Serialize)]
    struct Deep {
        child: Option<Box<Deep>>,
    }

    let mut value = Deep { child: None };
    for _ in 0..10 {
        value = Deep {
            child: Some(Box::new(value)),
        };
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = Client::from_url(format!("{}/deep", server.uri())).unwrap();
    let options = JsonOptions::default()
        .allow_reference_loops(false)
        .max_depth(4);
    let response = client.post_with(&value, options).await;

    assert_eq!(response.status(), ResponseStatus::Unused);
    let fault = response.fault().unwrap();
    assert!(fault.is_configuration());
    assert!(fault.to_string().starts_with("JSON Serialization Error"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_host_is_captured() {
    let config = ClientConfig::builder()
        .url("http://127.0.0.1:9/closed")
        .timeout(Duration::from_secs(2))
        .build();
    let response: Response<NoErrorPayload> = Client::new(config).unwrap().get().await;

    assert!(!response.is_success());
    assert_eq!(response.status(), ResponseStatus::Unused);
    assert!(response.fault().is_some());
    assert!(response.content().is_empty());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[derive(Debug, Serialize)]
struct NewUser<'a> {
    name: &'a str,
    email: Option<&'a str>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

#[tokio::test]
async fn test_create_and_fetch_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_string(r#"{"name":"ada"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1, "name": "ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::from_url(format!("{}/users", server.uri())).unwrap();
    let created = client
        .post(&NewUser {
            name: "ada",
            email: None,
        })
        .await;

    assert_eq!(created.status_code(), Some(StatusCode::CREATED));
    assert_eq!(
        created.decode_as::<User>(),
        Some(User {
            id: 1,
            name: "ada".into()
        })
    );
}

#[tokio::test]
async fn test_long_query_is_truncated_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let ids = vec!["1"; 1500].join("%2C");
    let url = format!("{}/search?ids={}", server.uri(), ids);
    assert!(url.len() > MAX_URL_LENGTH);

    let mut client = Client::from_url(url.clone()).unwrap();
    let response = client.get().await;
    assert!(response.is_success());
    assert_eq!(client.url(), url);

    let requests = server.received_requests().await.unwrap();
    let sent = requests[0].url.query().unwrap();
    assert!(!sent.ends_with("%2C"));
    let expected = Url::parse(&truncate_url(&url)).unwrap();
    assert!(expected.as_str().len() < MAX_URL_LENGTH);
    assert_eq!(expected.query(), Some(sent));

    client.set_url(format!("{}/search?ids=1", server.uri()));
    assert!(client.get().await.is_success());
}
