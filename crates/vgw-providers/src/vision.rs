//! A mock vision describer: reports the count and MIME types of attachments
//! without looking at their bytes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use vgw_core::domain::utterance::VisionAttachment;
use vgw_core::error::GatewayError;
use vgw_core::ports::tool::{ToolHandler, ToolSpec};
use vgw_core::ports::vision::VisionPort;

#[derive(Default)]
pub struct MockVision;

#[async_trait]
impl VisionPort for MockVision {
    async fn describe(&self, attachments: &[VisionAttachment]) -> Result<String, GatewayError> {
        if attachments.is_empty() {
            return Ok(String::new());
        }
        let kinds: Vec<&str> = attachments.iter().map(|a| a.mime_type.as_str()).collect();
        Ok(format!("{} attachment(s): {}", attachments.len(), kinds.join(", ")))
    }
}

/// Exposes a [`VisionPort`] to the LLM as a callable tool. Attachments ride
/// along on the user message rather than being auto-described (spec §4.3
/// step 3), so a playbook that wants vision in the loop registers this tool
/// and lets the model call it on the attachment it was just handed.
pub struct DescribeImageTool {
    vision: Arc<dyn VisionPort>,
}

impl DescribeImageTool {
    #[must_use]
    pub fn new(vision: Arc<dyn VisionPort>) -> Self {
        Self { vision }
    }
}

#[async_trait]
impl ToolHandler for DescribeImageTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "describe_image".to_string(),
            description: "Describe the image or images attached to the current message.".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "mime_type": { "type": "string" },
                    "data": { "type": "string", "description": "base64-encoded image bytes" },
                },
                "required": ["mime_type", "data"],
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, GatewayError> {
        let mime_type = arguments.get("mime_type").and_then(Value::as_str).unwrap_or("application/octet-stream").to_string();
        let data = arguments.get("data").and_then(Value::as_str).unwrap_or_default().to_string();
        let description = self.vision.describe(&[VisionAttachment { mime_type, data }]).await?;
        Ok(serde_json::json!({ "description": description }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn describes_attachment_count_and_mime_types() {
        let vision = MockVision;
        let description = vision
            .describe(&[VisionAttachment { mime_type: "image/png".into(), data: "AA==".into() }])
            .await
            .unwrap();
        assert!(description.contains("image/png"));
    }

    #[tokio::test]
    async fn describe_image_tool_delegates_to_the_vision_port() {
        let tool = DescribeImageTool::new(Arc::new(MockVision));
        let result = tool
            .execute(serde_json::json!({ "mime_type": "image/jpeg", "data": "AA==" }))
            .await
            .unwrap();
        assert!(result["description"].as_str().unwrap().contains("image/jpeg"));
    }
}
