use crate::features::{CategoryMap, FeatureVector, FEATURE_COUNT, FEATURE_ORDER};
use crate::model::ScoringError;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Serialized binary classifier: gradient-boosted depth-1 trees over the
/// fixed 7-feature vector, with the category label order that was used at
/// training time. Loaded once at startup; a load failure is fatal.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub feature_names: Vec<String>,
    pub categories: Vec<String>,
    pub bias: f64,
    pub trees: Vec<Stump>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact at {}", path.display()))?;
        let artifact: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse model artifact at {}", path.display()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.version.trim().is_empty(), "model version is empty");

        anyhow::ensure!(
            self.feature_names == FEATURE_ORDER,
            "model feature order mismatch: expected {FEATURE_ORDER:?}, got {:?}",
            self.feature_names
        );

        // The mapping is the model's contract; it must cover exactly the
        // known categories, each once.
        anyhow::ensure!(
            self.categories.len() == 3,
            "model must carry exactly 3 category labels (got {})",
            self.categories.len()
        );
        for label in ["Bienes", "Obras", "Servicios"] {
            anyhow::ensure!(
                self.categories.iter().filter(|l| *l == label).count() == 1,
                "model category map must contain '{label}' exactly once (got {:?})",
                self.categories
            );
        }

        anyhow::ensure!(self.bias.is_finite(), "model bias is not finite");
        anyhow::ensure!(!self.trees.is_empty(), "model has no trees");
        for (idx, tree) in self.trees.iter().enumerate() {
            anyhow::ensure!(
                tree.feature < FEATURE_COUNT,
                "tree {idx} splits on feature {} (max {})",
                tree.feature,
                FEATURE_COUNT - 1
            );
            anyhow::ensure!(
                tree.threshold.is_finite() && tree.left.is_finite() && tree.right.is_finite(),
                "tree {idx} has a non-finite threshold or leaf"
            );
        }

        Ok(())
    }

    pub fn category_map(&self) -> CategoryMap {
        CategoryMap::new(self.categories.clone())
    }

    /// `(prob_class0, prob_class1)`; class 1 is the win probability. Takes
    /// `&self` only; safe under concurrent calls.
    pub fn predict(&self, features: &FeatureVector) -> Result<(f64, f64), ScoringError> {
        let xs = features.as_slice();
        for (idx, x) in xs.iter().enumerate() {
            if !x.is_finite() {
                return Err(ScoringError::new(format!(
                    "feature {} ({}) is not finite",
                    idx, FEATURE_ORDER[idx]
                )));
            }
        }

        let category_code = xs[1];
        if category_code < 0.0 || category_code >= self.categories.len() as f64 {
            return Err(ScoringError::new(format!(
                "category code {category_code} outside model range 0..{}",
                self.categories.len()
            )));
        }

        let mut raw = self.bias;
        for tree in &self.trees {
            raw += if xs[tree.feature] <= tree.threshold {
                tree.left
            } else {
                tree.right
            };
        }

        let prob_win = sigmoid(raw);
        Ok((1.0 - prob_win, prob_win))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
impl ModelArtifact {
    /// Small hand-written model with the production shape, for tests.
    pub fn test_fixture() -> Self {
        serde_json::from_value(serde_json::json!({
            "version": "win-model-2026-02",
            "feature_names": FEATURE_ORDER,
            "categories": ["Bienes", "Obras", "Servicios"],
            "bias": 0.4,
            "trees": [
                {"feature": 0, "threshold": 4.0, "left": 0.9, "right": -0.7},
                {"feature": 3, "threshold": 90_000.0, "left": 0.3, "right": -0.2},
                {"feature": 5, "threshold": 180.0, "left": -0.1, "right": 0.2}
            ]
        }))
        .expect("test fixture must deserialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BidFeatures, FeatureEncoder};

    fn encode(artifact: &ModelArtifact, input: &BidFeatures) -> FeatureVector {
        FeatureEncoder::new(artifact.category_map())
            .encode(input)
            .unwrap()
    }

    fn base_input() -> BidFeatures {
        BidFeatures {
            number_of_tenderers: 3,
            main_category: "Servicios".to_string(),
            budget: 100_000.0,
            bid_amount: 85_000.0,
            tender_duration_days: 28,
            contract_duration_days: 365,
            historical_outcome: 0,
        }
    }

    #[test]
    fn predict_is_bounded_and_favors_low_competition() {
        let artifact = ModelArtifact::test_fixture();

        let few = encode(&artifact, &base_input());
        let mut crowded_input = base_input();
        crowded_input.number_of_tenderers = 15;
        let crowded = encode(&artifact, &crowded_input);

        let (_, p_few) = artifact.predict(&few).unwrap();
        let (_, p_crowded) = artifact.predict(&crowded).unwrap();

        assert!((0.0..=1.0).contains(&p_few));
        assert!((0.0..=1.0).contains(&p_crowded));
        assert!(p_few > p_crowded);
    }

    #[test]
    fn example_scenario_scores_high() {
        // 3 tenderers, Servicios, 100k budget, 85k bid, 28/365 days.
        let artifact = ModelArtifact::test_fixture();
        let v = encode(&artifact, &base_input());
        let (_, p) = artifact.predict(&v).unwrap();
        assert!(p >= 0.70, "fixture should score the example high, got {p}");
    }

    #[test]
    fn load_rejects_wrong_feature_order() {
        let mut artifact = ModelArtifact::test_fixture();
        artifact.feature_names.swap(0, 1);
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn load_rejects_incomplete_category_map() {
        let mut artifact = ModelArtifact::test_fixture();
        artifact.categories = vec!["Bienes".to_string(), "Obras".to_string(), "Obras".to_string()];
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn load_rejects_tree_on_unknown_feature() {
        let mut artifact = ModelArtifact::test_fixture();
        artifact.trees[0].feature = 7;
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn predict_rejects_out_of_range_category_code() {
        let artifact = ModelArtifact::test_fixture();
        // Category code the model never saw.
        let forged =
            FeatureVector::from_raw([3.0, 9.0, 100_000.0, 85_000.0, 28.0, 365.0, 0.0]);
        assert!(artifact.predict(&forged).is_err());
    }

    #[test]
    fn predict_rejects_non_finite_feature() {
        let artifact = ModelArtifact::test_fixture();
        let forged =
            FeatureVector::from_raw([3.0, 2.0, f64::NAN, 85_000.0, 28.0, 365.0, 0.0]);
        assert!(artifact.predict(&forged).is_err());
    }
}
