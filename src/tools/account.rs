//! Account tools

use super::{to_json, Tool, ToolDescription, ToolError, ToolOutput};
use crate::client::{CallContext, NounProjectClient};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// `get_api_usage`: quota limits and current consumption for the API key
pub struct ApiUsageTool {
    client: Arc<NounProjectClient>,
}

impl ApiUsageTool {
    pub fn new(client: Arc<NounProjectClient>) -> Self {
        Self { client }
    }

    pub fn description() -> ToolDescription {
        ToolDescription {
            name: "get_api_usage".to_string(),
            description: "Report hourly, daily and monthly API call limits and usage for the \
                          configured key."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for ApiUsageTool {
    fn describe(&self) -> ToolDescription {
        Self::description()
    }

    async fn execute(
        &self,
        _parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let usage = self.client.get_api_usage(ctx).await?;
        Ok(ToolOutput::Json(to_json(&usage)?))
    }
}
