//! Client construction fails fast, before any network activity

use noun_project_mcp::client::{CallContext, ClientConfig, SearchQuery};
use noun_project_mcp::{Credentials, ErrorKind, NounProjectClient};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_blank_credentials_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cases = [("", "secret"), ("key", ""), ("key", "   "), ("\t", "secret")];
    for (key, secret) in cases {
        let result = NounProjectClient::new(
            ClientConfig {
                base_url: server.uri(),
                ..Default::default()
            },
            Credentials::new(key, secret),
        );
        let err = result.err().expect("blank credentials must be rejected");
        assert_eq!(err.kind(), ErrorKind::ConfigurationError, "{key:?}/{secret:?}");
    }
}

#[test]
fn test_unusable_base_url_rejected() {
    let result = NounProjectClient::new(
        ClientConfig {
            base_url: "::not a url::".to_string(),
            ..Default::default()
        },
        Credentials::new("key", "secret"),
    );
    assert_eq!(
        result.err().map(|e| e.kind()),
        Some(ErrorKind::ConfigurationError)
    );
}

#[tokio::test]
async fn test_one_client_serves_many_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"icons": []})))
        .expect(3)
        .mount(&server)
        .await;

    let client = NounProjectClient::new(
        ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        },
        Credentials::new("key", "secret"),
    )
    .unwrap();

    for term in ["cat", "dog", "bird"] {
        let icons = client
            .search_icons(&SearchQuery::new(term), &CallContext::new())
            .await
            .unwrap();
        assert!(icons.is_empty());
    }
}
