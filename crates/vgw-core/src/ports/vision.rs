//! Vision capability interface (spec §3 `VisionAttachment`, §1 Non-goals:
//! provider network behavior is a black box).

use async_trait::async_trait;

use crate::domain::utterance::VisionAttachment;
use crate::error::GatewayError;

/// Describes image attachments in natural language so they can be folded
/// into the LLM prompt as text (spec §4.3 step 3: attachments ride along on
/// the next user message).
#[async_trait]
pub trait VisionPort: Send + Sync {
    async fn describe(&self, attachments: &[VisionAttachment]) -> Result<String, GatewayError>;
}
