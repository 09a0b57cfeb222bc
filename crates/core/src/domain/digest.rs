use crate::domain::tender::Tender;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DIGEST_TOP_N: usize = 3;
pub const VALIDITY_HOURS: i64 = 24;

pub const NO_CANDIDATES_MESSAGE: &str =
    "No hay suficientes licitaciones relevantes en este momento";

/// A tender that passed the ranking gates, carrying its heuristic point total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub tender: Tender,
    pub match_score: u32,
}

/// The single process-wide daily digest. Superseded atomically on
/// regeneration, never mutated in place. This is also the on-disk cache
/// document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecommendationSet {
    pub has_recommendations: bool,
    #[serde(default)]
    pub tenders: Vec<ScoredCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

impl DailyRecommendationSet {
    pub fn with_candidates(
        candidates: Vec<ScoredCandidate>,
        summary: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            has_recommendations: true,
            tenders: candidates,
            summary: Some(summary),
            message: None,
            generated_at: now,
            next_update: now + Duration::hours(VALIDITY_HOURS),
        }
    }

    /// All-or-nothing digest policy: fewer than top-N qualifiers yields an
    /// empty set, not a partial one.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            has_recommendations: false,
            tenders: Vec::new(),
            summary: None,
            message: Some(NO_CANDIDATES_MESSAGE.to_string()),
            generated_at: now,
            next_update: now + Duration::hours(VALIDITY_HOURS),
        }
    }

    /// Fresh means strictly less than the 24h validity window has elapsed.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.generated_at) < Duration::hours(VALIDITY_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn freshness_window_is_exclusive_at_24h() {
        let generated = Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap();
        let set = DailyRecommendationSet::empty(generated);

        assert!(set.is_fresh(generated));
        assert!(set.is_fresh(generated + Duration::hours(23) + Duration::minutes(59)));
        assert!(!set.is_fresh(generated + Duration::hours(24)));
        assert!(!set.is_fresh(generated + Duration::hours(25)));
    }

    #[test]
    fn next_update_is_generated_at_plus_24h() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap();
        let set = DailyRecommendationSet::empty(now);
        assert_eq!(set.next_update, now + Duration::hours(24));
    }

    #[test]
    fn empty_set_carries_message_and_no_candidates() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap();
        let set = DailyRecommendationSet::empty(now);
        assert!(!set.has_recommendations);
        assert!(set.tenders.is_empty());
        assert_eq!(set.message.as_deref(), Some(NO_CANDIDATES_MESSAGE));
    }
}
