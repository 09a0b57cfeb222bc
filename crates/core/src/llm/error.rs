use std::fmt;

/// Diagnostic error for a failed text-generation call. Never reaches a
/// request caller: the composer absorbs it into the deterministic fallback.
#[derive(Debug, Clone)]
pub struct LlmCallError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_body: Option<String>,
}

impl fmt::Display for LlmCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmCallError {}
