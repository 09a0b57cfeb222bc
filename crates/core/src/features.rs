use chrono::NaiveDate;
use std::fmt;

/// Training-time feature order. The serialized model was fitted against
/// exactly this column order; the artifact loader checks it at startup and
/// refuses to serve a model trained with a different layout.
pub const FEATURE_ORDER: [&str; 7] = [
    "NumberOfTenderers",
    "MainCategory",
    "Budget",
    "BidAmount",
    "TenderDurationDays",
    "ContractDurationDays",
    "Winner",
];

pub const FEATURE_COUNT: usize = FEATURE_ORDER.len();

/// Malformed or out-of-range input to the encoder. A client error: it is
/// never retried and never coerced into a default.
#[derive(Debug, Clone)]
pub struct InvalidFeatureError {
    pub field: &'static str,
    pub detail: String,
}

impl InvalidFeatureError {
    fn new(field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvalidFeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid feature (field={}): {}", self.field, self.detail)
    }
}

impl std::error::Error for InvalidFeatureError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCategory {
    Goods,
    Works,
    Services,
}

impl MainCategory {
    pub fn parse(label: &str) -> Result<Self, InvalidFeatureError> {
        match label {
            "Bienes" => Ok(Self::Goods),
            "Obras" => Ok(Self::Works),
            "Servicios" => Ok(Self::Services),
            other => Err(InvalidFeatureError::new(
                "main_category",
                format!(
                    "Categoría inválida: {other}. Debe ser 'Bienes', 'Obras' o 'Servicios'"
                ),
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Goods => "Bienes",
            Self::Works => "Obras",
            Self::Services => "Servicios",
        }
    }
}

/// Category label → integer code, in the order the classifier was trained
/// with. Carried by the model artifact so the mapping is versioned together
/// with the model rather than hardcoded here.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    labels: Vec<String>,
}

impl CategoryMap {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn code(&self, category: MainCategory) -> Option<usize> {
        self.labels.iter().position(|l| l == category.label())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Raw tender/bid attributes as they arrive at the predict boundary.
/// `historical_outcome` is 0 for a prospective bid; 1 only appears in
/// training data.
#[derive(Debug, Clone)]
pub struct BidFeatures {
    pub number_of_tenderers: i64,
    pub main_category: String,
    pub budget: f64,
    pub bid_amount: f64,
    pub tender_duration_days: i64,
    pub contract_duration_days: i64,
    pub historical_outcome: i64,
}

/// The fixed-order numeric vector fed to the classifier. Immutable once
/// built; reordering would silently corrupt predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Test-only escape hatch for building malformed vectors that the
    /// encoder would refuse to produce.
    #[cfg(test)]
    pub(crate) fn from_raw(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    categories: CategoryMap,
}

impl FeatureEncoder {
    pub fn new(categories: CategoryMap) -> Self {
        Self { categories }
    }

    /// Pure, total over well-formed input. Each validation rejects
    /// independently; nothing is silently coerced.
    pub fn encode(&self, input: &BidFeatures) -> Result<FeatureVector, InvalidFeatureError> {
        let category = MainCategory::parse(&input.main_category)?;
        let category_code = self.categories.code(category).ok_or_else(|| {
            InvalidFeatureError::new(
                "main_category",
                format!(
                    "Categoría '{}' no está en el mapa del modelo ({:?})",
                    category.label(),
                    self.categories.labels()
                ),
            )
        })?;

        ensure_positive_int("number_of_tenderers", input.number_of_tenderers)?;
        ensure_positive_amount("budget", input.budget)?;
        ensure_positive_amount("bid_amount", input.bid_amount)?;
        ensure_positive_int("tender_duration_days", input.tender_duration_days)?;
        ensure_positive_int("contract_duration_days", input.contract_duration_days)?;

        if input.historical_outcome != 0 && input.historical_outcome != 1 {
            return Err(InvalidFeatureError::new(
                "historical_outcome",
                format!("debe ser 0 o 1 (recibido {})", input.historical_outcome),
            ));
        }

        Ok(FeatureVector([
            input.number_of_tenderers as f64,
            category_code as f64,
            input.budget,
            input.bid_amount,
            input.tender_duration_days as f64,
            input.contract_duration_days as f64,
            input.historical_outcome as f64,
        ]))
    }
}

fn ensure_positive_int(field: &'static str, value: i64) -> Result<(), InvalidFeatureError> {
    if value <= 0 {
        return Err(InvalidFeatureError::new(
            field,
            format!("{field} debe ser mayor a 0 (recibido {value})"),
        ));
    }
    Ok(())
}

fn ensure_positive_amount(field: &'static str, value: f64) -> Result<(), InvalidFeatureError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(InvalidFeatureError::new(
            field,
            format!("{field} debe ser mayor a 0 (recibido {value})"),
        ));
    }
    Ok(())
}

/// Contract duration from a date pair. A same-day or inverted pair floors to
/// 1: a deliberate minimum, not a real duration.
pub fn contract_duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> FeatureEncoder {
        FeatureEncoder::new(CategoryMap::new(vec![
            "Bienes".to_string(),
            "Obras".to_string(),
            "Servicios".to_string(),
        ]))
    }

    fn valid_input() -> BidFeatures {
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
    fn encodes_in_training_order() {
        let v = encoder().encode(&valid_input()).unwrap();
        assert_eq!(
            v.as_slice(),
            &[3.0, 2.0, 100_000.0, 85_000.0, 28.0, 365.0, 0.0]
        );
    }

    #[test]
    fn category_code_comes_from_map_not_enum_order() {
        let reordered = FeatureEncoder::new(CategoryMap::new(vec![
            "Servicios".to_string(),
            "Bienes".to_string(),
            "Obras".to_string(),
        ]));
        let v = reordered.encode(&valid_input()).unwrap();
        assert_eq!(v.as_slice()[1], 0.0);
    }

    #[test]
    fn rejects_unknown_category_naming_the_value() {
        let mut input = valid_input();
        input.main_category = "Invalid".to_string();
        let err = encoder().encode(&input).unwrap_err();
        assert_eq!(err.field, "main_category");
        assert!(err.detail.contains("Invalid"), "detail: {}", err.detail);
    }

    #[test]
    fn rejects_each_non_positive_field_independently() {
        let cases: [(&str, fn(&mut BidFeatures)); 5] = [
            ("number_of_tenderers", |i| i.number_of_tenderers = 0),
            ("budget", |i| i.budget = 0.0),
            ("bid_amount", |i| i.bid_amount = -1.0),
            ("tender_duration_days", |i| i.tender_duration_days = 0),
            ("contract_duration_days", |i| i.contract_duration_days = -3),
        ];

        for (field, mutate) in cases {
            let mut input = valid_input();
            mutate(&mut input);
            let err = encoder().encode(&input).unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn rejects_historical_outcome_outside_binary() {
        let mut input = valid_input();
        input.historical_outcome = 2;
        assert!(encoder().encode(&input).is_err());
    }

    #[test]
    fn contract_duration_floors_at_one() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(contract_duration_days(d, d), 1);

        let earlier = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(contract_duration_days(d, earlier), 1);

        let later = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        assert_eq!(contract_duration_days(d, later), 10);
    }
}
