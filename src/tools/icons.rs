//! Icon tools: search, details, download and term suggestions

use super::{
    id_schema, parse_arguments, thumbnail_size_schema, to_json, IdArgument, Tool,
    ToolDescription, ToolError, ToolOutput,
};
use crate::client::{CallContext, DownloadRequest, IconFormat, NounProjectClient, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchIconsArgs {
    term: String,
    limit: Option<u32>,
    offset: Option<u32>,
    #[serde(default)]
    public_domain_only: bool,
    thumbnail_size: Option<u32>,
    #[serde(default)]
    include_svg: bool,
}

impl From<SearchIconsArgs> for SearchQuery {
    fn from(args: SearchIconsArgs) -> Self {
        SearchQuery {
            term: args.term,
            limit: args.limit,
            offset: args.offset,
            public_domain_only: args.public_domain_only,
            thumbnail_size: args.thumbnail_size,
            include_svg: args.include_svg,
        }
    }
}

/// `search_icons`: icons matching a term, in relevance order
pub struct SearchIconsTool {
    client: Arc<NounProjectClient>,
}

impl SearchIconsTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "search_icons".to_string(),
            description: "Search The Noun Project for icons matching a term. Results keep the \
                          upstream relevance order."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "term": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Search term, e.g. \"cat\" or \"shopping cart\""
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of icons to return"
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of results to skip, for paging"
                    },
                    "public_domain_only": {
                        "type": "boolean",
                        "default": false,
                        "description": "Only return public domain icons"
                    },
                    "thumbnail_size": thumbnail_size_schema(),
                    "include_svg": {
                        "type": "boolean",
                        "default": false,
                        "description": "Ask the upstream to include SVG markup where licensed"
                    }
                },
                "required": ["term"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for SearchIconsTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: SearchIconsArgs = parse_arguments(parameters)?;
        let query = SearchQuery::from(args);

        let icons = self.client.search_icons(&query, ctx).await?;

        Ok(ToolOutput::Json(json!({
            "term": query.term.trim(),
            "count": icons.len(),
            "icons": to_json(&icons)?,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct IconDetailsArgs {
    icon_id: IdArgument,
    thumbnail_size: Option<u32>,
}

/// `get_icon_details`: full metadata for one icon
pub struct GetIconDetailsTool {
    client: Arc<NounProjectClient>,
}

impl GetIconDetailsTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "get_icon_details".to_string(),
            description: "Fetch full metadata for one icon: creator, license, tags, \
                          collections and available download formats."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "icon_id": id_schema("Icon identifier as returned by search_icons"),
                    "thumbnail_size": thumbnail_size_schema()
                },
                "required": ["icon_id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for GetIconDetailsTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: IconDetailsArgs = parse_arguments(parameters)?;
        let icon_id = args.icon_id.into_string();

        let details = self
            .client
            .get_icon_details(&icon_id, args.thumbnail_size, ctx)
            .await?;

        Ok(ToolOutput::Json(to_json(&details)?))
    }
}

#[derive(Debug, Deserialize)]
struct DownloadIconArgs {
    icon_id: IdArgument,
    format: Option<String>,
    size: Option<u32>,
    color: Option<String>,
}

impl TryFrom<DownloadIconArgs> for DownloadRequest {
    type Error = ToolError;

    fn try_from(args: DownloadIconArgs) -> Result<Self, Self::Error> {
        let format = match args.format.as_deref() {
            Some(format) => format.parse::<IconFormat>()?,
            None => IconFormat::Png,
        };
        Ok(DownloadRequest {
            icon_id: args.icon_id.into_string(),
            format,
            size: args.size,
            color: args.color,
        })
    }
}

/// `download_icon`: the icon file itself, returned inline as an image
pub struct DownloadIconTool {
    client: Arc<NounProjectClient>,
}

impl DownloadIconTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "download_icon".to_string(),
            description: "Download an icon as SVG or PNG, optionally recolored. The file is \
                          returned inline; nothing is written to disk."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "icon_id": id_schema("Icon identifier as returned by search_icons"),
                    "format": {
                        "type": "string",
                        "default": "png",
                        "description": "File format: \"svg\" or \"png\""
                    },
                    "size": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "PNG edge length in pixels. Not allowed for SVG"
                    },
                    "color": {
                        "type": "string",
                        "description": "Hex color such as \"FF0000\" or \"#FF0000\""
                    }
                },
                "required": ["icon_id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for DownloadIconTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: DownloadIconArgs = parse_arguments(parameters)?;
        let request = DownloadRequest::try_from(args)?;

        let asset = self.client.download_icon(&request, ctx).await?;

        let metadata = json!({
            "icon_id": request.icon_id.trim(),
            "format": asset.format,
            "content_type": asset.content_type,
            "size_bytes": asset.len(),
        });
        Ok(ToolOutput::Image {
            data: asset.content,
            mime_type: asset.content_type,
            metadata,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteArgs {
    term: String,
    limit: Option<u32>,
}

/// `autocomplete_search`: search term suggestions for a partial query
pub struct AutocompleteTool {
    client: Arc<NounProjectClient>,
}

impl AutocompleteTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "autocomplete_search".to_string(),
            description: "Suggest icon search terms that complete a partial query.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "term": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Partial search term"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of suggestions"
                    }
                },
                "required": ["term"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for AutocompleteTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: AutocompleteArgs = parse_arguments(parameters)?;

        let suggestions = self.client.autocomplete(&args.term, args.limit, ctx).await?;

        Ok(ToolOutput::Json(json!({
            "term": args.term.trim(),
            "suggestions": suggestions,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, IconError};

    #[test]
    fn test_download_args_default_to_png() {
        let args: DownloadIconArgs = serde_json::from_value(json!({"icon_id": 42})).unwrap();
        let request = DownloadRequest::try_from(args).unwrap();
        assert_eq!(request.icon_id, "42");
        assert_eq!(request.format, IconFormat::Png);
    }

    #[test]
    fn test_download_args_reject_unknown_format() {
        let args: DownloadIconArgs =
            serde_json::from_value(json!({"icon_id": "42", "format": "gif"})).unwrap();
        let err = DownloadRequest::try_from(args).unwrap_err();
        assert!(matches!(err, ToolError::Icon(IconError::InvalidArgument { .. })));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_search_args_map_to_query() {
        let args: SearchIconsArgs = serde_json::from_value(json!({
            "term": "cat",
            "limit": 5,
            "public_domain_only": true
        }))
        .unwrap();
        let query = SearchQuery::from(args);
        assert_eq!(query.term, "cat");
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, None);
        assert!(query.public_domain_only);
        assert!(!query.include_svg);
    }
}
