//! Collection tools

use super::{
    id_schema, parse_arguments, thumbnail_size_schema, to_json, IdArgument, Tool,
    ToolDescription, ToolError, ToolOutput,
};
use crate::client::{CallContext, CollectionRequest, NounProjectClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchCollectionsArgs {
    term: String,
    limit: Option<u32>,
}

/// `search_collections`: curated icon sets matching a term
pub struct SearchCollectionsTool {
    client: Arc<NounProjectClient>,
}

impl SearchCollectionsTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "search_collections".to_string(),
            description: "Search icon collections (curated sets of related icons) by term."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "term": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Search term"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of collections to return"
                    }
                },
                "required": ["term"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for SearchCollectionsTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: SearchCollectionsArgs = parse_arguments(parameters)?;

        let collections = self
            .client
            .search_collections(&args.term, args.limit, ctx)
            .await?;

        Ok(ToolOutput::Json(json!({
            "term": args.term.trim(),
            "count": collections.len(),
            "collections": to_json(&collections)?,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct CollectionDetailsArgs {
    collection_id: IdArgument,
    limit: Option<u32>,
    thumbnail_size: Option<u32>,
    #[serde(default)]
    include_svg: bool,
}

impl From<CollectionDetailsArgs> for CollectionRequest {
    fn from(args: CollectionDetailsArgs) -> Self {
        CollectionRequest {
            collection_id: args.collection_id.into_string(),
            limit: args.limit,
            thumbnail_size: args.thumbnail_size,
            include_svg: args.include_svg,
        }
    }
}

/// `get_collection_details`: one collection and the icons in it
pub struct GetCollectionDetailsTool {
    client: Arc<NounProjectClient>,
}

impl GetCollectionDetailsTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "get_collection_details".to_string(),
            description: "Fetch one collection together with the icons it contains.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "collection_id": id_schema("Collection identifier"),
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of icons to include"
                    },
                    "thumbnail_size": thumbnail_size_schema(),
                    "include_svg": {
                        "type": "boolean",
                        "default": false
                    }
                },
                "required": ["collection_id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for GetCollectionDetailsTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: CollectionDetailsArgs = parse_arguments(parameters)?;
        let request = CollectionRequest::from(args);

        let details = self.client.get_collection_details(&request, ctx).await?;

        Ok(ToolOutput::Json(to_json(&details)?))
    }
}
