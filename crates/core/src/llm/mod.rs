pub mod error;
pub mod openai;

/// A single chat-style generation request. Prompts are built by the
/// composer; clients only move them over the wire.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn generate(&self, prompt: ChatPrompt) -> anyhow::Result<String>;
}
