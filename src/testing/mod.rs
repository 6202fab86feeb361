//! Fixtures shared by unit and integration tests
//!
//! Upstream JSON bodies shaped like Noun Project v2 responses, plus helpers
//! that build a client pointed at a mock server.

use crate::client::{ClientConfig, NounProjectClient};
use crate::config::Credentials;
use crate::error::IconResult;
use serde_json::{json, Value};
use std::time::Duration;

pub const TEST_API_KEY: &str = "test-key";
pub const TEST_API_SECRET: &str = "test-secret";

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_API_KEY, TEST_API_SECRET)
}

/// Client aimed at `base_url` with a short timeout
pub fn test_client(base_url: &str) -> IconResult<NounProjectClient> {
    let config = ClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    NounProjectClient::new(config, test_credentials())
}

/// One icon as it appears in search results
pub fn icon_json(id: u64, term: &str) -> Value {
    json!({
        "id": id,
        "term": term,
        "tags": [term, {"slug": format!("{term}-outline")}],
        "thumbnail_url": format!("https://static.thenounproject.com/png/{id}-84.png"),
        "license_description": "creative-commons-attribution",
        "attribution": format!("{term} by Jane Doe from Noun Project"),
        "permalink": format!("/icon/{term}-{id}/"),
        "lang": "en"
    })
}

/// Body of `GET /v2/icon` holding `icons` in the given order
pub fn search_response(icons: Vec<Value>) -> Value {
    json!({
        "generated_at": "2024-05-01 12:00:00.000000",
        "icons": icons,
        "next_page": "abc",
        "usage_limits": {"monthly": {"limit": 5000, "usage": 12}}
    })
}

/// Body of `GET /v2/icon/{id}`
pub fn icon_details_response(id: u64) -> Value {
    json!({
        "icon": {
            "id": id.to_string(),
            "term": "cat",
            "tags": ["cat", "pet", "animal"],
            "preview_url": format!("https://static.thenounproject.com/png/{id}-200.png"),
            "thumbnail_url": format!("https://static.thenounproject.com/png/{id}-84.png"),
            "license_description": "public-domain",
            "attribution": "cat by Jane Doe from Noun Project",
            "attribution_preview_url": format!("https://static.thenounproject.com/attribution/{id}-600.png"),
            "permalink": format!("/icon/cat-{id}/"),
            "creator": {
                "name": "Jane Doe",
                "username": "janedoe",
                "permalink": "/janedoe/"
            },
            "collections": [{"id": 77, "name": "Pets"}],
            "styles": [{"style": "line"}]
        }
    })
}

/// Body of `GET /v2/icon/autocomplete`
pub fn autocomplete_response(terms: &[&str]) -> Value {
    let suggestions: Vec<Value> = terms.iter().map(|term| json!({"term": term})).collect();
    json!({ "suggestions": suggestions })
}

pub fn collection_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "icon_count": "12",
        "permalink": format!("/collection/{id}/"),
        "creator": {"name": "Jane Doe", "username": "janedoe"}
    })
}

/// Body of `GET /v2/collection/{id}`
pub fn collection_details_response(id: u64, icons: Vec<Value>) -> Value {
    let mut collection = collection_json(id, "Pets");
    collection["icons"] = Value::Array(icons);
    json!({ "collection": collection })
}

/// Body of `GET /v2/client/usage`
pub fn usage_response() -> Value {
    json!({
        "limits": {"hourly": null, "daily": 5000, "monthly": 50000},
        "usage": {"hourly": 3, "daily": 40, "monthly": 900}
    })
}

/// Body of the JSON download envelope
pub fn download_payload(content: &[u8], content_type: &str) -> Value {
    use base64::Engine;
    json!({
        "base64_encoded_file": base64::engine::general_purpose::STANDARD.encode(content),
        "content_type": content_type
    })
}

/// Smallest valid SVG document
pub const SAMPLE_SVG: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><rect width="1" height="1"/></svg>"#;

/// PNG file signature followed by a few bytes of body
pub const SAMPLE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
