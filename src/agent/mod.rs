mod gemini_client;
mod prompt_guard;
mod rate_limiter;
mod response_parser;

use async_trait::async_trait;
pub use gemini_client::GeminiClient;
pub use prompt_guard::*;
pub use rate_limiter::*;
pub use response_parser::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ModelPrompt {
    pub system_instruction: String,
    /// Oldest first; the last turn is the user's current message.
    pub turns: Vec<ChatTurn>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String, anyhow::Error>;
}
