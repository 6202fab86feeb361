//! Tool layer end to end: schema validation, dispatch and result shaping


use noun_project_mcp::client::CallContext;
use noun_project_mcp::protocol::ContentItem;
use noun_project_mcp::testing::{download_payload, icon_details_response, icon_json, search_response, SAMPLE_PNG};
use noun_project_mcp::tools::{error_result, noun_project_descriptions, ToolOutput};
use noun_project_mcp::{ErrorKind, ToolError, ToolSystem};
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::mock_upstream;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn tool_system() -> (wiremock::MockServer, ToolSystem) {
    let (server, client) = mock_upstream().await;
    (server, ToolSystem::with_noun_project(Arc::new(client)))
}

#[tokio::test]
async fn test_all_tools_registered() {
    let (_server, tools) = tool_system().await;

    assert_eq!(
        tools.list_tools(),
        vec![
            "autocomplete_search",
            "download_icon",
            "get_api_usage",
            "get_collection_details",
            "get_icon_details",
            "search_collections",
            "search_icons",
        ]
    );

    let registered: Vec<String> = tools.describe_all().into_iter().map(|d| d.name).collect();
    let listed: Vec<String> = noun_project_descriptions()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(registered, listed);
}

#[tokio::test]
async fn test_search_tool_returns_pretty_json() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon"))
        .and(query_param("query", "search"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![
            icon_json(1, "a"),
            icon_json(2, "b"),
            icon_json(3, "c"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools
        .execute_tool(
            "search_icons",
            &json!({"term": "search", "limit": 5}),
            &CallContext::new(),
        )
        .await
        .unwrap();

    let ToolOutput::Json(value) = &output else {
        panic!("expected JSON output");
    };
    assert_eq!(value["count"], 3);
    assert_eq!(value["icons"][2]["id"], "3");

    let result = output.into_call_result();
    assert!(!result.is_error);
    let ContentItem::Text { text } = &result.content[0] else {
        panic!("expected text content");
    };
    assert!(text.contains('\n'), "JSON should be pretty printed");
}

#[tokio::test]
async fn test_schema_rejects_before_any_request() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let bad_calls = [
        ("search_icons", json!({})),
        ("search_icons", json!({"term": ""})),
        ("search_icons", json!({"term": "cat", "limit": 0})),
        ("search_icons", json!({"term": "cat", "color": "red"})),
        ("get_icon_details", json!({"icon_id": true})),
        ("get_icon_details", json!({"icon_id": "1", "thumbnail_size": 50})),
        ("download_icon", json!({"icon_id": "1", "size": -3})),
        ("get_api_usage", json!({"unexpected": 1})),
    ];

    for (tool, params) in bad_calls {
        let err = tools
            .execute_tool(tool, &params, &CallContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{tool} {params}");
    }
}

#[tokio::test]
async fn test_details_tool_accepts_numeric_id() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(icon_details_response(12345)))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools
        .execute_tool(
            "get_icon_details",
            &json!({"icon_id": 12345}),
            &CallContext::new(),
        )
        .await
        .unwrap();

    let ToolOutput::Json(value) = output else {
        panic!("expected JSON output");
    };
    assert_eq!(value["id"], "12345");
    assert_eq!(value["is_public_domain"], true);
    assert_eq!(value["available_formats"], json!(["svg", "png"]));
}

#[tokio::test]
async fn test_download_tool_returns_image_and_metadata() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/42/download"))
        .and(query_param("filetype", "png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(download_payload(SAMPLE_PNG, "image/png")),
        )
        .mount(&server)
        .await;

    let output = tools
        .execute_tool("download_icon", &json!({"icon_id": "42"}), &CallContext::new())
        .await
        .unwrap();
    let result = output.into_call_result();

    assert_eq!(result.content.len(), 2);
    assert!(matches!(
        &result.content[0],
        ContentItem::Image { mime_type, .. } if mime_type == "image/png"
    ));
    let ContentItem::Text { text } = &result.content[1] else {
        panic!("expected metadata text");
    };
    let metadata: Value = serde_json::from_str(text).unwrap();
    assert_eq!(metadata["icon_id"], "42");
    assert_eq!(metadata["format"], "png");
    assert_eq!(metadata["size_bytes"], SAMPLE_PNG.len());
}

#[tokio::test]
async fn test_download_tool_rejects_svg_size() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = tools
        .execute_tool(
            "download_icon",
            &json!({"icon_id": "42", "format": "SVG", "size": 64}),
            &CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_upstream_error_becomes_error_result() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "60"))
        .mount(&server)
        .await;

    let err = tools
        .execute_tool("get_api_usage", &json!({}), &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Icon(_)));

    let result = error_result(&err.to_payload());
    assert!(result.is_error);
    let ContentItem::Text { text } = &result.content[0] else {
        panic!("expected text content");
    };
    let body: Value = serde_json::from_str(text).unwrap();
    assert_eq!(body["error"]["kind"], "RateLimited");
    assert_eq!(body["error"]["retry_after_secs"], 60);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() {
    let (server, tools) = tool_system().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![icon_json(
            1, "x",
        )])))
        .expect(8)
        .mount(&server)
        .await;

    let tools = Arc::new(tools);
    let calls = (0..8).map(|i| {
        let tools = tools.clone();
        async move {
            tools
                .execute_tool(
                    "search_icons",
                    &json!({"term": format!("term {i}")}),
                    &CallContext::new(),
                )
                .await
        }
    });

    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| r.is_ok()));
}
