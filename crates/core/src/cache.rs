use crate::compose::RecommendationComposer;
use crate::domain::digest::{DailyRecommendationSet, DIGEST_TOP_N};
use crate::domain::tender::Tender;
use crate::rank;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces a fresh digest. Seam so the cache can be tested with a counting
/// stub; the production implementation is `TenderPoolDigest`.
#[async_trait::async_trait]
pub trait DigestGenerator: Send + Sync {
    async fn generate(&self, now: DateTime<Utc>) -> anyhow::Result<DailyRecommendationSet>;
}

#[derive(Debug, Default)]
struct CacheSlot {
    hydrated: bool,
    value: Option<DailyRecommendationSet>,
}

/// Single-slot, 24h-bounded cache of the daily digest, durably mirrored to a
/// JSON file so it survives restarts within the validity window.
///
/// The slot mutex is held across regeneration: concurrent readers that
/// observe staleness collapse into one in-flight generation, and the losers
/// pick up the winner's value on their own freshness re-check.
pub struct DailyRecommendationCache {
    path: PathBuf,
    slot: tokio::sync::Mutex<CacheSlot>,
}

impl DailyRecommendationCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: tokio::sync::Mutex::new(CacheSlot::default()),
        }
    }

    pub async fn read_or_generate(
        &self,
        now: DateTime<Utc>,
        generator: &dyn DigestGenerator,
    ) -> anyhow::Result<DailyRecommendationSet> {
        let mut slot = self.slot.lock().await;

        if !slot.hydrated {
            slot.value = self.read_persisted();
            slot.hydrated = true;
        }

        if let Some(cached) = &slot.value {
            if cached.is_fresh(now) {
                tracing::debug!(generated_at = %cached.generated_at, "serving cached digest");
                return Ok(cached.clone());
            }
        }

        tracing::info!("digest cache empty or stale; regenerating");
        let fresh = generator.generate(now).await?;
        self.write_persisted(&fresh);
        slot.value = Some(fresh.clone());
        Ok(fresh)
    }

    /// Corrupt or missing file is EMPTY, never an error.
    fn read_persisted(&self) -> Option<DailyRecommendationSet> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cache file unreadable; treating as empty");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(set) => Some(set),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cache file corrupt; treating as empty");
                None
            }
        }
    }

    /// Persistence is best-effort: a write failure loses restart durability
    /// but must not fail the request.
    fn write_persisted(&self, set: &DailyRecommendationSet) {
        let result = (|| -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let raw = serde_json::to_string_pretty(set)?;
            std::fs::write(&self.path, raw)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), next_update = %set.next_update, "digest persisted")
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to persist digest")
            }
        }
    }
}

/// Production generator: load the tender pool, rank it, summarize the top
/// candidates. All-or-nothing: fewer than top-N qualifiers yields an empty
/// set (no partial digest), unlike the permissive raw tender listings.
pub struct TenderPoolDigest {
    composer: Arc<RecommendationComposer>,
    tenders_path: PathBuf,
}

impl TenderPoolDigest {
    pub fn new(composer: Arc<RecommendationComposer>, tenders_path: impl Into<PathBuf>) -> Self {
        Self {
            composer,
            tenders_path: tenders_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl DigestGenerator for TenderPoolDigest {
    async fn generate(&self, now: DateTime<Utc>) -> anyhow::Result<DailyRecommendationSet> {
        let pool = load_tender_pool(&self.tenders_path);
        tracing::info!(pool_len = pool.len(), "ranking tender pool for daily digest");

        let candidates = rank::rank(&pool, DIGEST_TOP_N, now);
        if candidates.len() < DIGEST_TOP_N {
            tracing::info!(
                qualified = candidates.len(),
                required = DIGEST_TOP_N,
                "not enough qualifying tenders; digest is empty"
            );
            return Ok(DailyRecommendationSet::empty(now));
        }

        let summary = self.composer.summarize_digest(&candidates).await;
        Ok(DailyRecommendationSet::with_candidates(candidates, summary, now))
    }
}

/// The feed file is either `{"tenders": [...]}` or a bare array. A missing
/// or unreadable file is an empty pool: the digest then reports no
/// recommendations rather than failing.
pub fn load_tender_pool(path: &Path) -> Vec<Tender> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PoolFile {
        Wrapped { tenders: Vec<Tender> },
        Bare(Vec<Tender>),
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "tender feed unreadable; empty pool");
            return Vec::new();
        }
    };

    match serde_json::from_str::<PoolFile>(&raw) {
        Ok(PoolFile::Wrapped { tenders }) | Ok(PoolFile::Bare(tenders)) => tenders,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "tender feed unparsable; empty pool");
            Vec::new()
        }
    }
}
