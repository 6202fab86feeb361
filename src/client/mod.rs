//! Noun Project API client
//!
//! [`NounProjectClient`] turns each operation into exactly one OAuth1-signed
//! GET against the v2 API and classifies every failure into an [`IconError`].
//! It holds only immutable state and is shared between concurrent calls.

pub mod context;
pub mod oauth;
pub mod types;

pub use context::CallContext;
pub use oauth::OAuth1Signer;
pub use types::{
    ApiUsage, Collection, CollectionDetails, CollectionRef, CollectionRequest, Creator,
    DownloadRequest, DownloadedAsset, IconDetails, IconFormat, IconSummary, SearchQuery,
    UsageWindow,
};

use crate::config::{ConfigError, Credentials, ServerConfig, DEFAULT_BASE_URL};
use crate::error::{IconError, IconResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use oauth::percent_encode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn, Instrument};
use types::{
    decode_icons, require_id, require_term, validate_limit, validate_thumbnail_size,
    AutocompleteResponse, CollectionResponse, CollectionsResponse, DownloadPayload, IconResponse,
    SearchResponse,
};
use url::Url;

/// Longest upstream error body echoed back in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_response_bytes: 5 * 1024 * 1024,
            user_agent: format!("noun-project-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&ServerConfig> for ClientConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout: config.timeout(),
            max_response_bytes: config.api.max_response_bytes,
            ..Default::default()
        }
    }
}

/// Authenticated client for the Noun Project v2 API
#[derive(Debug, Clone)]
pub struct NounProjectClient {
    base_url: Url,
    max_response_bytes: usize,
    http: reqwest::Client,
    signer: OAuth1Signer,
}

impl NounProjectClient {
    /// Create a new client.
    ///
    /// Fails with a configuration error before any network activity when the
    /// credentials are blank or the base URL is unusable.
    pub fn new(config: ClientConfig, credentials: Credentials) -> IconResult<Self> {
        credentials.validate()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ConfigError::InvalidConfig(format!("base URL '{}': {e}", config.base_url))
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            max_response_bytes: config.max_response_bytes,
            http,
            signer: OAuth1Signer::new(&credentials),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Search icons by term, in the upstream's relevance order
    pub async fn search_icons(
        &self,
        query: &SearchQuery,
        ctx: &CallContext,
    ) -> IconResult<Vec<IconSummary>> {
        query.validate()?;

        match self
            .get_json::<SearchResponse>("search_icons", "/v2/icon", &query.to_params(), ctx)
            .await
        {
            Ok(response) => decode_icons(response.icons),
            Err(IconError::NotFound { .. }) => {
                debug!(term = %query.term, "upstream reported no matching icons");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch full metadata for one icon
    pub async fn get_icon_details(
        &self,
        icon_id: &str,
        thumbnail_size: Option<u32>,
        ctx: &CallContext,
    ) -> IconResult<IconDetails> {
        require_id("icon_id", icon_id)?;
        validate_thumbnail_size(thumbnail_size)?;

        let mut params = Vec::new();
        if let Some(size) = thumbnail_size {
            params.push(("thumbnail_size", size.to_string()));
        }

        let path = format!("/v2/icon/{}", percent_encode(icon_id.trim()));
        let response = self
            .get_json::<IconResponse>("get_icon_details", &path, &params, ctx)
            .await?;

        let icon = response.icon.ok_or_else(|| {
            IconError::malformed_response(format!("no icon object for id {}", icon_id.trim()))
        })?;
        IconDetails::try_from(icon)
    }

    /// Download an icon asset in the requested format
    pub async fn download_icon(
        &self,
        request: &DownloadRequest,
        ctx: &CallContext,
    ) -> IconResult<DownloadedAsset> {
        request.validate()?;
        require_id("icon_id", &request.icon_id)?;

        let path = format!(
            "/v2/icon/{}/download",
            percent_encode(request.icon_id.trim())
        );
        let url = self.endpoint(&path, &request.to_params()?);
        let span = crate::upstream_span!(
            operation = "download_icon",
            icon_id = %request.icon_id.trim(),
            format = %request.format
        );

        ctx.run(async {
            let response = self.send(&url).await?;
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = self.read_body(response).await?;
            self.decode_asset(request.format, content_type, body)
        })
        .instrument(span)
        .await
    }

    /// Suggest search terms for a partial query
    pub async fn autocomplete(
        &self,
        term: &str,
        limit: Option<u32>,
        ctx: &CallContext,
    ) -> IconResult<Vec<String>> {
        require_term(term)?;
        validate_limit(limit)?;

        let params = term_params(term, limit);
        let response = self
            .get_json::<AutocompleteResponse>("autocomplete", "/v2/icon/autocomplete", &params, ctx)
            .await?;

        Ok(response
            .suggestions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.term)
            .filter(|t| !t.trim().is_empty())
            .collect())
    }

    /// Search icon collections by term
    pub async fn search_collections(
        &self,
        term: &str,
        limit: Option<u32>,
        ctx: &CallContext,
    ) -> IconResult<Vec<Collection>> {
        require_term(term)?;
        validate_limit(limit)?;

        let params = term_params(term, limit);
        match self
            .get_json::<CollectionsResponse>("search_collections", "/v2/collection", &params, ctx)
            .await
        {
            Ok(response) => Ok(response.collections.unwrap_or_default()),
            Err(IconError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Fetch a collection together with its icons
    pub async fn get_collection_details(
        &self,
        request: &CollectionRequest,
        ctx: &CallContext,
    ) -> IconResult<CollectionDetails> {
        request.validate()?;

        let path = format!(
            "/v2/collection/{}",
            percent_encode(request.collection_id.trim())
        );
        let response = self
            .get_json::<CollectionResponse>(
                "get_collection_details",
                &path,
                &request.to_params(),
                ctx,
            )
            .await?;

        let wire = response.collection.ok_or_else(|| {
            IconError::malformed_response(format!(
                "no collection object for id {}",
                request.collection_id.trim()
            ))
        })?;

        Ok(CollectionDetails {
            collection: wire.collection,
            icons: decode_icons(wire.icons)?,
        })
    }

    /// Report quota and consumption for the configured key
    pub async fn get_api_usage(&self, ctx: &CallContext) -> IconResult<ApiUsage> {
        self.get_json::<ApiUsage>("get_api_usage", "/v2/client/usage", &[], ctx)
            .await
    }

    fn endpoint(&self, path: &str, params: &[(&'static str, String)]) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}{path}"));

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }

        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&'static str, String)],
        ctx: &CallContext,
    ) -> IconResult<T> {
        let url = self.endpoint(path, params);
        let span = crate::upstream_span!(operation = operation, path = %url.path());

        ctx.run(async {
            let response = self.send(&url).await?;
            let body = self.read_body(response).await?;
            serde_json::from_slice::<T>(&body)
                .map_err(|e| IconError::malformed_response(e.to_string()))
        })
        .instrument(span)
        .await
    }

    /// Sign and send a GET, classifying any non-success status
    async fn send(&self, url: &Url) -> IconResult<reqwest::Response> {
        let authorization = self.signer.authorization_header("GET", url);

        debug!(url = %url, "sending upstream request");
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "upstream request succeeded");
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();

        let error = IconError::from_status(status.as_u16(), retry_after.as_deref(), &body);
        warn!(
            status = status.as_u16(),
            kind = %error.kind(),
            "upstream request failed"
        );
        Err(error)
    }

    /// Collect a response body, refusing anything over the size limit
    async fn read_body(&self, mut response: reqwest::Response) -> IconResult<Bytes> {
        let limit = self.max_response_bytes;
        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(too_large(length as usize, limit));
            }
        }

        let mut buffer = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if buffer.len() + chunk.len() > limit {
                return Err(too_large(buffer.len() + chunk.len(), limit));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }

    fn decode_asset(
        &self,
        format: IconFormat,
        content_type: Option<String>,
        body: Bytes,
    ) -> IconResult<DownloadedAsset> {
        match content_type {
            Some(ct) if is_json_media_type(&ct) => {
                let payload: DownloadPayload = serde_json::from_slice(&body)
                    .map_err(|e| IconError::malformed_response(e.to_string()))?;
                if payload.content_type.trim().is_empty() {
                    return Err(IconError::malformed_response(
                        "download payload has an empty content_type",
                    ));
                }
                let content = STANDARD
                    .decode(payload.base64_encoded_file.trim())
                    .map_err(|e| IconError::malformed_response(format!("base64 body: {e}")))?;

                Ok(DownloadedAsset {
                    content: Bytes::from(content),
                    content_type: payload.content_type,
                    format,
                })
            }
            Some(ct) => Ok(DownloadedAsset {
                content: body,
                content_type: ct,
                format,
            }),
            None => Err(IconError::malformed_response(
                "download response has no content type",
            )),
        }
    }
}

fn term_params(term: &str, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut params = vec![("query", term.trim().to_string())];
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn too_large(size: usize, limit: usize) -> IconError {
    IconError::Upstream {
        status: None,
        message: format!("response too large: {size} bytes (max: {limit})"),
    }
}
