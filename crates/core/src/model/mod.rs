pub mod artifact;

pub use artifact::ModelArtifact;

use crate::features::{FeatureEncoder, FeatureVector};
use std::fmt;
use std::sync::Arc;

/// Per-call scoring failure: malformed vector or an artifact defect that
/// survived load validation. Distinct from `InvalidFeatureError` (a client
/// problem) and from the fatal artifact-load failure at startup.
#[derive(Debug, Clone)]
pub struct ScoringError {
    pub detail: String,
}

impl ScoringError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scoring failed: {}", self.detail)
    }
}

impl std::error::Error for ScoringError {}

/// Seam for the classifier so callers and tests can substitute deterministic
/// stubs. Implementations must be safe to call concurrently.
pub trait WinScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoringError>;

    fn model_version(&self) -> &str;
}

/// Stateless wrapper around the pre-loaded classifier. The artifact is
/// read-only for the process lifetime; there is no hot-reload.
#[derive(Debug, Clone)]
pub struct ProbabilityScorer {
    artifact: Arc<ModelArtifact>,
}

impl ProbabilityScorer {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Arc::new(artifact),
        }
    }

    /// Encoder bound to this model's category mapping, so encoding and
    /// scoring cannot drift across model versions.
    pub fn encoder(&self) -> FeatureEncoder {
        FeatureEncoder::new(self.artifact.category_map())
    }
}

impl WinScorer for ProbabilityScorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        let (_prob_lose, prob_win) = self.artifact.predict(features)?;
        Ok(prob_win)
    }

    fn model_version(&self) -> &str {
        &self.artifact.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::BidFeatures;

    #[test]
    fn score_of_encoded_input_is_a_probability() {
        let scorer = ProbabilityScorer::new(ModelArtifact::test_fixture());
        let encoder = scorer.encoder();

        let input = BidFeatures {
            number_of_tenderers: 3,
            main_category: "Servicios".to_string(),
            budget: 100_000.0,
            bid_amount: 85_000.0,
            tender_duration_days: 28,
            contract_duration_days: 365,
            historical_outcome: 0,
        };

        let v = encoder.encode(&input).unwrap();
        let p = scorer.score(&v).unwrap();
        assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
    }

    #[test]
    fn probabilities_of_both_classes_sum_to_one() {
        let artifact = ModelArtifact::test_fixture();
        let encoder = FeatureEncoder::new(artifact.category_map());
        let input = BidFeatures {
            number_of_tenderers: 12,
            main_category: "Obras".to_string(),
            budget: 40_000.0,
            bid_amount: 41_000.0,
            tender_duration_days: 10,
            contract_duration_days: 90,
            historical_outcome: 0,
        };
        let v = encoder.encode(&input).unwrap();
        let (p0, p1) = artifact.predict(&v).unwrap();
        assert!((p0 + p1 - 1.0).abs() < 1e-12);
    }
}
