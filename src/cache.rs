use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::{models::CatalogEntry, services::providers::CatalogProvider};

/// One successful catalog fetch. Replaced wholesale, never edited in place.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub entries: Arc<Vec<CatalogEntry>>,
    pub fetched_at: Instant,
}

impl CatalogSnapshot {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Holds the most recent successful catalog fetch.
///
/// Reads within the TTL are served from memory. Past the TTL a refresh is
/// attempted; if it fails, the previous snapshot is served regardless of its
/// age so an upstream outage degrades to stale recommendations instead of
/// errors. Concurrent readers of an expired snapshot share one refresh.
#[derive(Clone)]
pub struct CatalogCache {
    provider: Arc<dyn CatalogProvider>,
    snapshot: Arc<RwLock<Option<Arc<CatalogSnapshot>>>>,
    refresh: Arc<Mutex<()>>,
}

impl CatalogCache {
    /// Creates an empty cache over the given provider
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self {
            provider,
            snapshot: Arc::new(RwLock::new(None)),
            refresh: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the catalog, refreshing it when older than `ttl`.
    ///
    /// Empty only when no fetch has ever succeeded.
    pub async fn get(&self, ttl: Duration) -> Arc<Vec<CatalogEntry>> {
        let current = self.snapshot.read().await.clone();

        if let Some(snapshot) = &current {
            if !snapshot.entries.is_empty() && snapshot.age() < ttl {
                tracing::debug!(
                    count = snapshot.entries.len(),
                    age_secs = snapshot.age().as_secs(),
                    "Catalog cache hit"
                );
                return Arc::clone(&snapshot.entries);
            }
        }

        let _refresh = self.refresh.lock().await;

        let latest = self.snapshot.read().await.clone();
        if let Some(snapshot) = replaced_since(current.as_ref(), latest.as_ref()) {
            tracing::debug!(count = snapshot.entries.len(), "Catalog refreshed by another reader");
            return Arc::clone(&snapshot.entries);
        }

        match self.provider.fetch_catalog().await {
            Ok(entries) if !entries.is_empty() => {
                let snapshot = Arc::new(CatalogSnapshot {
                    entries: Arc::new(entries),
                    fetched_at: Instant::now(),
                });
                let entries = Arc::clone(&snapshot.entries);
                *self.snapshot.write().await = Some(snapshot);

                tracing::info!(
                    count = entries.len(),
                    provider = self.provider.name(),
                    "Catalog cache refreshed"
                );
                entries
            }
            outcome => {
                if let Err(e) = &outcome {
                    tracing::warn!(error = %e, provider = self.provider.name(), "Catalog fetch failed");
                } else {
                    tracing::warn!(provider = self.provider.name(), "Catalog fetch returned no entries");
                }
                self.fallback(current).await
            }
        }
    }

    /// Drops the cached catalog, forcing the next read to fetch
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    /// Age of the cached catalog, if any
    pub async fn age(&self) -> Option<Duration> {
        self.snapshot.read().await.as_ref().map(|s| s.age())
    }

    async fn fallback(&self, seen: Option<Arc<CatalogSnapshot>>) -> Arc<Vec<CatalogEntry>> {
        // A concurrent refresh may have landed while this fetch was failing.
        let latest = self.snapshot.read().await.clone().or(seen);

        match latest {
            Some(snapshot) => {
                tracing::warn!(
                    count = snapshot.entries.len(),
                    age_secs = snapshot.age().as_secs(),
                    "Serving stale catalog"
                );
                Arc::clone(&snapshot.entries)
            }
            None => {
                tracing::warn!("No cached catalog available");
                Arc::new(Vec::new())
            }
        }
    }
}

/// The snapshot in `latest` when it is not the one this reader started from
fn replaced_since<'a>(
    seen: Option<&Arc<CatalogSnapshot>>,
    latest: Option<&'a Arc<CatalogSnapshot>>,
) -> Option<&'a Arc<CatalogSnapshot>> {
    match (seen, latest) {
        (Some(seen), Some(latest)) if Arc::ptr_eq(seen, latest) => None,
        (_, latest) => latest,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::services::providers::MockCatalogProvider;

    const LONG_TTL: Duration = Duration::from_secs(3600);

    fn entries(ids: &[&str]) -> Vec<CatalogEntry> {
        ids.iter().map(|id| CatalogEntry::new(*id, format!("Podcast {}", id))).collect()
    }

    fn provider_with(
        results: Vec<Result<Vec<CatalogEntry>, AppError>>,
    ) -> Arc<dyn CatalogProvider> {
        let mut mock = MockCatalogProvider::new();
        let mut sequence = mockall::Sequence::new();
        for result in results {
            mock.expect_fetch_catalog()
                .times(1)
                .in_sequence(&mut sequence)
                .return_once(move || result);
        }
        mock.expect_name().return_const("mock");
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_skips_upstream() {
        let cache = CatalogCache::new(provider_with(vec![Ok(entries(&["a", "b"]))]));

        let first = cache.get(LONG_TTL).await;
        let second = cache.get(LONG_TTL).await;

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expired_with_failing_fetch_serves_stale() {
        let cache = CatalogCache::new(provider_with(vec![
            Ok(entries(&["a", "b"])),
            Err(AppError::ExternalApi("503".into())),
        ]));

        let fresh = cache.get(LONG_TTL).await;
        let stale = cache.get(Duration::ZERO).await;

        assert_eq!(fresh, stale);
        assert!(cache.age().await.is_some());
    }

    #[tokio::test]
    async fn test_expired_with_empty_fetch_serves_stale() {
        let cache = CatalogCache::new(provider_with(vec![Ok(entries(&["a"])), Ok(Vec::new())]));

        cache.get(LONG_TTL).await;
        let stale = cache.get(Duration::ZERO).await;

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].podcast_id, "a");
    }

    #[tokio::test]
    async fn test_initial_failure_returns_empty() {
        let cache = CatalogCache::new(provider_with(vec![Err(AppError::ExternalApi(
            "down".into(),
        ))]));

        assert!(cache.get(LONG_TTL).await.is_empty());
        assert!(cache.age().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_with_successful_fetch_replaces_catalog() {
        let cache = CatalogCache::new(provider_with(vec![
            Ok(entries(&["a"])),
            Ok(entries(&["b", "c"])),
        ]));

        cache.get(LONG_TTL).await;
        let refreshed = cache.get(Duration::ZERO).await;

        assert_eq!(refreshed.len(), 2);
        assert_eq!(refreshed[0].podcast_id, "b");
    }

    struct SlowProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogProvider for SlowProvider {
        async fn fetch_catalog(&self) -> AppResult<Vec<CatalogEntry>> {
            let version = format!("v{}", self.calls.fetch_add(1, Ordering::SeqCst));
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(entries(&[version.as_str()]))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_concurrent_expired_reads_share_one_fetch() {
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let cache = CatalogCache::new(provider.clone());

        let (a, b, c, d) = tokio::join!(
            cache.get(LONG_TTL),
            cache.get(LONG_TTL),
            cache.get(LONG_TTL),
            cache.get(LONG_TTL)
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!([&b, &c, &d].iter().all(|other| **other == a));

        let (e, f, g) = tokio::join!(
            cache.get(Duration::ZERO),
            cache.get(Duration::ZERO),
            cache.get(Duration::ZERO)
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(e[0].podcast_id, "v1");
        assert_eq!(e, f);
        assert_eq!(f, g);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = CatalogCache::new(provider_with(vec![
            Ok(entries(&["a"])),
            Ok(entries(&["z"])),
        ]));

        cache.get(LONG_TTL).await;
        cache.invalidate().await;
        let refetched = cache.get(LONG_TTL).await;

        assert_eq!(refetched[0].podcast_id, "z");
    }
}
