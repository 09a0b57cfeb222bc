use serde::{Deserialize, Serialize};

/// A published procurement opportunity, as it arrives from the tender feed.
/// Everything except the title is optional on the wire; scoring and ranking
/// treat absent fields as non-contributing rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tender {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_tenderers: Option<i64>,
    /// ISO-8601 date or datetime. Kept as a string: an unparsable value must
    /// degrade silently in ranking, not fail deserialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tender_end_date: Option<String>,
}

/// The company on whose behalf a bid is evaluated. Sector and size are
/// rendered as "No especificado" in prompts when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}
