use crate::domain::digest::ScoredCandidate;
use crate::domain::tender::Tender;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Statuses counted as "open" for the digest. Case-insensitive; the feed
/// mixes Spanish and OCDS-style labels.
const OPEN_STATUSES: [&str; 3] = ["abierta", "active", "open"];

/// Substrings marking a technology-relevant category. Matched against the
/// lowercased category text.
const TECH_KEYWORDS: [&str; 5] = ["tecnolog", "software", "ti", "informát", "sistemas"];

const MIN_QUALIFYING_SCORE: u32 = 50;

/// Heuristic point total for one tender, or `None` if its status fails the
/// open gate (the score is never computed for closed tenders).
pub fn match_score(tender: &Tender, now: DateTime<Utc>) -> Option<u32> {
    let status = tender.status.as_deref().unwrap_or("").to_lowercase();
    if !OPEN_STATUSES.contains(&status.as_str()) {
        return None;
    }

    let mut score = 0u32;

    let category = tender
        .main_category
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    if TECH_KEYWORDS.iter().any(|kw| category.contains(kw)) {
        score += 40;
    }

    // Bands are ordered; first match wins.
    let budget = tender.budget_amount.unwrap_or(0.0);
    if (20_000.0..=100_000.0).contains(&budget) {
        score += 30;
    } else if (10_000.0..=150_000.0).contains(&budget) {
        score += 15;
    }

    let competitors = tender.number_of_tenderers.unwrap_or(0);
    if competitors <= 3 {
        score += 20;
    } else if competitors <= 7 {
        score += 10;
    }

    // Missing or unparsable end date contributes nothing, silently.
    if let Some(end) = tender.tender_end_date.as_deref().and_then(parse_end_date) {
        if end.signed_duration_since(now).num_days() > 15 {
            score += 10;
        }
    }

    Some(score)
}

/// Scores, gates and orders the pool. Output is sorted by score descending
/// with ties keeping input order, truncated to `top_n`.
pub fn rank(pool: &[Tender], top_n: usize, now: DateTime<Utc>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = pool
        .iter()
        .filter_map(|tender| {
            let score = match_score(tender, now)?;
            (score >= MIN_QUALIFYING_SCORE).then(|| ScoredCandidate {
                tender: tender.clone(),
                match_score: score,
            })
        })
        .collect();

    // Stable sort: equal scores keep first-seen order.
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored.truncate(top_n);
    scored
}

/// Accepts RFC 3339, a bare `YYYY-MM-DD`, or a naive datetime; anything else
/// is `None`.
fn parse_end_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}
