// Generation module
// Delegates answer text to an external chat model in JSON output mode

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

pub use openai::OpenAiChatClient;

/// The two parallel outputs requested in one round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    /// Markdown-formatted answer for display
    pub reply: String,
    /// Short plain-text paraphrase for text-to-speech
    #[serde(default)]
    pub speak: String,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredReply, ProviderError>;
}
