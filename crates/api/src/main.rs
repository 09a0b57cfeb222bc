use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use licita_core::cache::{DailyRecommendationCache, TenderPoolDigest};
use licita_core::compose::{RecommendationComposer, RecommendationContext};
use licita_core::domain::digest::DailyRecommendationSet;
use licita_core::domain::tender::CompanyProfile;
use licita_core::features::{BidFeatures, FeatureEncoder};
use licita_core::llm::openai::OpenAiClient;
use licita_core::llm::TextGenerator;
use licita_core::model::{ModelArtifact, ProbabilityScorer, WinScorer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = licita_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // The classifier is load-bearing for every predict request: a missing or
    // malformed artifact must stop the process before it serves.
    let artifact = ModelArtifact::load(settings.model_path())?;
    tracing::info!(version = %artifact.version, path = settings.model_path(), "classifier loaded");
    let scorer = ProbabilityScorer::new(artifact);
    let encoder = scorer.encoder();

    // Missing credentials are a configuration state, not an error: the
    // composer then serves its deterministic fallback.
    let generator: Option<Arc<dyn TextGenerator>> = match OpenAiClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            tracing::warn!(error = %err, "text generation unavailable; serving deterministic fallbacks");
            None
        }
    };
    let composer = Arc::new(RecommendationComposer::new(generator));

    let digest = Arc::new(TenderPoolDigest::new(
        Arc::clone(&composer),
        settings.tenders_path(),
    ));
    let cache = Arc::new(DailyRecommendationCache::new(settings.cache_path()));

    let state = AppState {
        scorer: Arc::new(scorer),
        encoder: Arc::new(encoder),
        composer,
        digest,
        cache,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/recommendations/daily", get(get_daily_recommendations))
        .route("/participations/predict", post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    scorer: Arc<ProbabilityScorer>,
    encoder: Arc<FeatureEncoder>,
    composer: Arc<RecommendationComposer>,
    digest: Arc<TenderPoolDigest>,
    cache: Arc<DailyRecommendationCache>,
}

#[derive(Debug, Serialize)]
struct DailyResponse {
    success: bool,
    data: DailyRecommendationSet,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

fn error_body(message: impl Into<String>) -> Json<ErrorBody> {
    Json(ErrorBody {
        success: false,
        error: message.into(),
    })
}

async fn get_daily_recommendations(
    State(state): State<AppState>,
) -> Result<Json<DailyResponse>, (StatusCode, Json<ErrorBody>)> {
    let now = chrono::Utc::now();
    let data = state
        .cache
        .read_or_generate(now, state.digest.as_ref())
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "daily digest failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(format!("Error generando recomendaciones: {e:#}")),
            )
        })?;

    Ok(Json(DailyResponse {
        success: true,
        data,
    }))
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    tender_data: PredictTender,
    bid_amount: f64,
    #[serde(default = "default_contract_duration_days")]
    contract_duration_days: i64,
}

#[derive(Debug, Deserialize)]
struct PredictTender {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    main_category: String,
    budget_amount: f64,
    #[serde(default)]
    buyer_name: String,
    #[serde(default)]
    eligibility_criteria: String,
    number_of_tenderers: i64,
    tender_duration_days: i64,
}

fn default_contract_duration_days() -> i64 {
    365
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    predicted_win_probability: f64,
    recommendation: String,
    bid_amount: f64,
    tender_title: String,
    main_category: String,
}

/// Encoding and scoring failures surface (400 / 500); composition never
/// does — a degraded recommendation still answers with 200.
async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorBody>)> {
    let features = BidFeatures {
        number_of_tenderers: req.tender_data.number_of_tenderers,
        main_category: req.tender_data.main_category.clone(),
        budget: req.tender_data.budget_amount,
        bid_amount: req.bid_amount,
        tender_duration_days: req.tender_data.tender_duration_days,
        contract_duration_days: req.contract_duration_days,
        historical_outcome: 0,
    };

    let vector = state
        .encoder
        .encode(&features)
        .map_err(|e| (StatusCode::BAD_REQUEST, error_body(e.to_string())))?;

    let probability = state.scorer.score(&vector).map_err(|e| {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "scoring failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(format!("Error en predicción: {err:#}")),
        )
    })?;

    let ctx = RecommendationContext {
        tender_title: req.tender_data.title.clone(),
        tender_description: req.tender_data.description.clone(),
        main_category: req.tender_data.main_category.clone(),
        budget_amount: req.tender_data.budget_amount,
        buyer_name: req.tender_data.buyer_name.clone(),
        eligibility_criteria: req.tender_data.eligibility_criteria.clone(),
        number_of_tenderers: req.tender_data.number_of_tenderers,
        company: CompanyProfile {
            name: "Mi Empresa PYME".to_string(),
            sector: None,
            size: None,
        },
        bid_amount: req.bid_amount,
        probability,
    };
    let recommendation = state.composer.compose(&ctx).await;

    Ok(Json(PredictResponse {
        predicted_win_probability: probability,
        recommendation,
        bid_amount: req.bid_amount,
        tender_title: req.tender_data.title,
        main_category: req.tender_data.main_category,
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &licita_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
