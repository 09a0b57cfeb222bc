pub mod cache;
pub mod compose;
pub mod domain;
pub mod features;
pub mod llm;
pub mod model;
pub mod rank;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_MODEL_PATH: &str = "model/win_model.json";
    pub const DEFAULT_CACHE_PATH: &str = "data/daily_recommendations.json";
    pub const DEFAULT_TENDERS_PATH: &str = "data/tenders.json";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub model_path: Option<String>,
        pub cache_path: Option<String>,
        pub tenders_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                model_path: std::env::var("MODEL_PATH").ok(),
                cache_path: std::env::var("RECOMMENDATIONS_CACHE_PATH").ok(),
                tenders_path: std::env::var("TENDERS_PATH").ok(),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn model_path(&self) -> &str {
            self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH)
        }

        pub fn cache_path(&self) -> &str {
            self.cache_path.as_deref().unwrap_or(DEFAULT_CACHE_PATH)
        }

        pub fn tenders_path(&self) -> &str {
            self.tenders_path.as_deref().unwrap_or(DEFAULT_TENDERS_PATH)
        }
    }
}
