//! Persisted results of complete runs.
//!
//! A run is identified by its section, page count, attachment-parsing flag
//! and calendar date. Entries are never invalidated: a new day produces a new
//! key.

use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::db::{Database, DbError};
use crate::posting::HarvestedPosting;

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The database failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The postings could not be encoded.
    #[error("failed to encode cached postings: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(error: sqlx::Error) -> Self {
        Self::Db(DbError::Query(error))
    }
}

/// Digest identifying one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key of a run.
    #[must_use]
    pub fn for_run(section: &str, pages: u32, parse_attachments: bool, run_date: NaiveDate) -> Self {
        let mode = if parse_attachments { "parsed" } else { "meta" };
        let material = format!("{section}_{pages}_{mode}_{}", run_date.format("%Y-%m-%d"));
        Self(format!("{:x}", Sha256::digest(material.as_bytes())))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Get/put store of harvested postings.
#[derive(Debug, Clone)]
pub struct ResultCache {
    db: Database,
}

impl ResultCache {
    /// Wraps an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the cache database at `path`.
    ///
    /// A database that cannot be opened is logged and yields `None`; the run
    /// then proceeds uncached.
    pub async fn open(path: &Path) -> Option<Self> {
        match Database::new(path).await {
            Ok(db) => Some(Self::new(db)),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "cache unavailable, running uncached");
                None
            }
        }
    }

    /// Like [`ResultCache::get`], with a failing lookup logged and read as a miss.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Vec<HarvestedPosting>> {
        self.get(key).await.unwrap_or_else(|error| {
            warn!(key = %key, error = %error, "cache lookup failed, crawling instead");
            None
        })
    }

    /// Like [`ResultCache::put`], with a failing store logged and skipped.
    ///
    /// Returns whether the entry was stored.
    pub async fn store(&self, key: &CacheKey, postings: &[HarvestedPosting]) -> bool {
        match self.put(key, postings).await {
            Ok(()) => true,
            Err(error) => {
                warn!(key = %key, error = %error, "cache store failed, results not cached");
                false
            }
        }
    }

    /// Returns the postings stored under `key`.
    ///
    /// An entry whose payload no longer decodes reads as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Db`] when the query fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Vec<HarvestedPosting>>, CacheError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM run_cache WHERE cache_key = ?")
                .bind(key.as_str())
                .fetch_optional(self.db.pool())
                .await?;

        let Some((payload,)) = row else {
            debug!("cache miss");
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(postings) => {
                debug!("cache hit");
                Ok(Some(postings))
            }
            Err(error) => {
                warn!(error = %error, "ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Stores `postings` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when encoding or the insert fails.
    #[instrument(skip(self, postings), fields(key = %key, postings = postings.len()))]
    pub async fn put(&self, key: &CacheKey, postings: &[HarvestedPosting]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(postings)?;
        sqlx::query(
            r"INSERT INTO run_cache (cache_key, payload, postings, created_at)
              VALUES (?, ?, ?, datetime('now'))
              ON CONFLICT(cache_key) DO UPDATE SET
                  payload = excluded.payload,
                  postings = excluded.postings,
                  created_at = excluded.created_at",
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(i64::try_from(postings.len()).unwrap_or(i64::MAX))
        .execute(self.db.pool())
        .await?;
        debug!("cache entry stored");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::posting::{AnalysisResult, AnalysisSource, PostingRecord};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
    }

    fn posting(url: &str) -> HarvestedPosting {
        HarvestedPosting {
            record: PostingRecord {
                url: url.to_string(),
                title: "Titre".to_string(),
                organization: "undetermined".to_string(),
                date: "11/02/2026".to_string(),
                page_text: "Texte".to_string(),
                attachments: Vec::new(),
                file_emails: BTreeSet::new(),
            },
            analysis: AnalysisResult {
                organization: "ALCS".to_string(),
                emails: vec!["web@alcs.ma".to_string()],
                sector: "Health".to_string(),
                opportunity_type: "Short mission".to_string(),
                location: "Rabat".to_string(),
                summary: "Mission.".to_string(),
                keywords: vec!["VIH".to_string()],
            },
            source: AnalysisSource::Model,
        }
    }

    #[test]
    fn test_key_depends_on_every_component() {
        let base = CacheKey::for_run("appels-doffres", 3, true, date());
        assert_eq!(base, CacheKey::for_run("appels-doffres", 3, true, date()));
        assert_eq!(base.as_str().len(), 64);
        assert_ne!(base, CacheKey::for_run("offres-demploi", 3, true, date()));
        assert_ne!(base, CacheKey::for_run("appels-doffres", 4, true, date()));
        assert_ne!(base, CacheKey::for_run("appels-doffres", 3, false, date()));
        assert_ne!(
            base,
            CacheKey::for_run("appels-doffres", 3, true, date().succ_opt().unwrap())
        );
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = ResultCache::new(Database::new_in_memory().await.unwrap());
        let key = CacheKey::for_run("appels-doffres", 1, true, date());

        assert!(cache.get(&key).await.unwrap().is_none());
        cache.put(&key, &[posting("https://tanmia.ma/a/")]).await.unwrap();
        cache
            .put(&key, &[posting("https://tanmia.ma/a/"), posting("https://tanmia.ma/b/")])
            .await
            .unwrap();

        let cached = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[1].record.url, "https://tanmia.ma/b/");
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let db = Database::new_in_memory().await.unwrap();
        let key = CacheKey::for_run("appels-doffres", 1, false, date());
        sqlx::query("INSERT INTO run_cache (cache_key, payload, created_at) VALUES (?, '{not json', datetime('now'))")
            .bind(key.as_str())
            .execute(db.pool())
            .await
            .unwrap();

        let cache = ResultCache::new(db);
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broken_store_reads_as_miss_and_skips_writes() {
        let db = Database::new_in_memory().await.unwrap();
        sqlx::query("DROP TABLE run_cache")
            .execute(db.pool())
            .await
            .unwrap();
        let cache = ResultCache::new(db);
        let key = CacheKey::for_run("appels-doffres", 1, true, date());

        assert!(cache.get(&key).await.is_err());
        assert!(cache.lookup(&key).await.is_none());
        assert!(!cache.store(&key, &[posting("https://tanmia.ma/a/")]).await);
    }
}
