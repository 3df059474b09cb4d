//! Friendly-name to provider-ID resolution with memoization.
//!
//! Resolution paginates the provider's search-by-name call. Zero matches is
//! fatal; more than one logs a warning and deterministically picks the first
//! (provider-returned order). Results are memoized so repeated controller
//! construction against the same names does not repeat paginated lookups.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::api::{ApiError, DeployApi, LookupOp};
use crate::error::BackendError;

const CACHE_CAPACITY: u64 = 256;

type CacheKey = (LookupOp, String, Option<String>);

/// Resolves friendly names to provider IDs, memoizing per
/// `(operation, name, parent-id)`.
pub struct NameResolver {
    api: Arc<dyn DeployApi>,
    cache: Cache<CacheKey, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl NameResolver {
    pub fn new(api: Arc<dyn DeployApi>) -> Self {
        NameResolver {
            api,
            cache: Cache::new(CACHE_CAPACITY),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve `name` to a provider ID.
    pub async fn resolve(
        &self,
        op: LookupOp,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, BackendError> {
        let key: CacheKey = (op, name.to_string(), parent.map(str::to_owned));
        if let Some(id) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let ids = self.search_all_pages(op, name, parent).await?;
        let Some(first) = ids.first() else {
            return Err(BackendError::NotFound {
                operation: op.to_string(),
                name: name.to_string(),
            });
        };

        if ids.len() > 1 {
            tracing::warn!(
                operation = %op,
                name,
                selected = %first,
                ignored = ?&ids[1..],
                "multiple IDs matched; using the first and ignoring the rest",
            );
        }

        self.cache.insert(key, first.clone());
        Ok(first.clone())
    }

    async fn search_all_pages(
        &self,
        op: LookupOp,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        let mut ids = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let result = self
                .api
                .search_ids(op, name, parent, page.as_deref())
                .await?;
            ids.extend(result.ids);
            match result.next_page {
                Some(next) => page = Some(next),
                None => return Ok(ids),
            }
        }
    }

    /// Cache hit/miss counters. Test-only observability, not a public
    /// contract.
    #[cfg(test)]
    pub(crate) fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
