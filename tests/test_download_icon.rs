//! download_icon behavior: formats, payload shapes, size limits and cancellation


use bytes::Bytes;
use noun_project_mcp::client::{CallContext, ClientConfig, DownloadRequest, IconFormat};
use noun_project_mcp::testing::{download_payload, test_credentials, SAMPLE_PNG, SAMPLE_SVG};
use noun_project_mcp::{ErrorKind, IconError, NounProjectClient};
use std::time::Duration;
use test_helpers::{mock_upstream, read_request_head, OAUTH_HEADER_PATTERN};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_svg_download_from_json_payload() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/42/download"))
        .and(query_param("filetype", "svg"))
        .and(header_regex("authorization", OAUTH_HEADER_PATTERN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(download_payload(SAMPLE_SVG.as_bytes(), "image/svg+xml")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let asset = client
        .download_icon(
            &DownloadRequest::new("42", IconFormat::Svg),
            &CallContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(asset.format, IconFormat::Svg);
    assert_eq!(asset.content_type, "image/svg+xml");
    assert_eq!(asset.content, Bytes::from_static(SAMPLE_SVG.as_bytes()));
}

#[tokio::test]
async fn test_png_download_with_size_and_color() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/42/download"))
        .and(query_param("filetype", "png"))
        .and(query_param("size", "200"))
        .and(query_param("color", "FF0000"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(download_payload(SAMPLE_PNG, "image/png")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = DownloadRequest::new("42", IconFormat::Png)
        .with_size(200)
        .with_color("#ff0000");
    let asset = client
        .download_icon(&request, &CallContext::new())
        .await
        .unwrap();

    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.len(), SAMPLE_PNG.len());
    assert!(asset.content.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn test_raw_body_uses_response_content_type() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/42/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SAMPLE_PNG.to_vec(), "image/png"))
        .mount(&server)
        .await;

    let asset = client
        .download_icon(
            &DownloadRequest::new("42", IconFormat::Png),
            &CallContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.content, Bytes::from_static(SAMPLE_PNG));
}

#[tokio::test]
async fn test_invalid_combinations_never_reach_upstream() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let invalid = [
        DownloadRequest::new("42", IconFormat::Svg).with_size(200),
        DownloadRequest::new("42", IconFormat::Png).with_size(0),
        DownloadRequest::new("42", IconFormat::Png).with_color("red"),
        DownloadRequest::new("42", IconFormat::Png).with_color("#12345"),
        DownloadRequest::new("", IconFormat::Png),
    ];

    for request in &invalid {
        let err = client
            .download_icon(request, &CallContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{request:?}");
    }
}

#[tokio::test]
async fn test_unknown_icon_is_not_found() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/999/download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .download_icon(
            &DownloadRequest::new("999", IconFormat::Png),
            &CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_bad_base64_is_upstream_error() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "base64_encoded_file": "***not base64***",
            "content_type": "image/png"
        })))
        .mount(&server)
        .await;

    let err = client
        .download_icon(
            &DownloadRequest::new("1", IconFormat::Png),
            &CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = MockServer::start().await;
    let client = NounProjectClient::new(
        ClientConfig {
            base_url: server.uri(),
            max_response_bytes: 16,
            ..Default::default()
        },
        test_credentials(),
    )
    .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 1024], "image/png"))
        .mount(&server)
        .await;

    let err = client
        .download_icon(
            &DownloadRequest::new("1", IconFormat::Png),
            &CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
    assert!(err.to_string().contains("too large"));
}

#[tokio::test]
async fn test_cancel_during_download() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .and(path("/v2/icon/42/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(SAMPLE_PNG.to_vec(), "image/png")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = std::time::Instant::now();
    let result = client
        .download_icon(&DownloadRequest::new("42", IconFormat::Png), &ctx)
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(IconError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_cancel_closes_upstream_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (request_seen_tx, request_seen_rx) = tokio::sync::oneshot::channel();

    // Upstream that accepts the request and never answers
    let upstream = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let head = read_request_head(&mut socket).await;
        assert!(head.starts_with(b"GET /v2/icon/42/download?"));
        request_seen_tx.send(()).unwrap();

        let mut buf = [0u8; 64];
        tokio::time::timeout(Duration::from_secs(5), socket.read(&mut buf)).await
    });

    let client = noun_project_mcp::testing::test_client(&format!("http://{address}")).unwrap();
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());

    let request = DownloadRequest::new("42", IconFormat::Png);
    let (result, ()) = tokio::join!(client.download_icon(&request, &ctx), async {
        request_seen_rx.await.unwrap();
        token.cancel();
    });
    assert!(matches!(result, Err(IconError::Cancelled)));

    let read = upstream
        .await
        .unwrap()
        .expect("connection stayed open after cancellation");
    assert!(
        matches!(read, Ok(0) | Err(_)),
        "expected connection close, got {read:?}"
    );
}

#[tokio::test]
async fn test_pre_cancelled_context_sends_nothing() {
    let (server, client) = mock_upstream().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = CallContext::new();
    ctx.cancel();

    let err = client
        .download_icon(&DownloadRequest::new("42", IconFormat::Png), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
