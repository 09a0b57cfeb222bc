use crate::config::Settings;
use crate::llm::error::LlmCallError;
use crate::llm::{ChatPrompt, TextGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Chat-completions client. Built once at startup; the construction-time
/// reqwest timeout bounds every call.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn chat_completion(&self, req: ChatCompletionRequest) -> anyhow::Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            return Err(LlmCallError {
                provider: PROVIDER,
                stage: "http",
                detail: format!("status={status}"),
                raw_body: Some(text),
            }
            .into());
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response: {text}"))?;
        parsed.first_content().ok_or_else(|| {
            LlmCallError {
                provider: PROVIDER,
                stage: "decode",
                detail: "response contained no message content".to_string(),
                raw_body: Some(text),
            }
            .into()
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, prompt: ChatPrompt) -> anyhow::Result<String> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system,
                },
                Message {
                    role: "user",
                    content: prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };
        self.chat_completion(req).await
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_content(&self) -> Option<String> {
        self.choices
            .iter()
            .find_map(|c| c.message.content.as_deref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chat_completion_content() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "  Se recomienda participar.  "},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        })
        .to_string();

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&body).unwrap();
        assert_eq!(
            parsed.first_content().as_deref(),
            Some("Se recomienda participar.")
        );
    }

    #[test]
    fn empty_content_is_treated_as_missing() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": ""}}]
        })
        .to_string();

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&body).unwrap();
        assert!(parsed.first_content().is_none());
    }

    #[test]
    fn null_content_does_not_fail_decoding() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })
        .to_string();

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&body).unwrap();
        assert!(parsed.first_content().is_none());
    }
}
