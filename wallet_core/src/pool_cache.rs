use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::{PoolInfoSource, SourceError, TokenPoolInfo};

/// Remembers pool lookups for the lifetime of a run. Pool creation times
/// never change, so hits are served without touching the provider.
/// Failures are not cached.
pub struct CachedPoolInfo<P> {
    inner: P,
    cache: RwLock<HashMap<String, TokenPoolInfo>>,
}

impl<P: PoolInfoSource> CachedPoolInfo<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, token_address: &str) -> Option<TokenPoolInfo> {
        self.cache
            .read()
            .ok()
            .and_then(|c| c.get(token_address).cloned())
    }
}

#[async_trait]
impl<P: PoolInfoSource> PoolInfoSource for CachedPoolInfo<P> {
    async fn token_pool_info(&self, token_address: &str) -> Result<TokenPoolInfo, SourceError> {
        if let Some(hit) = self.cached(token_address) {
            debug!("Pool cache hit for {}", token_address);
            return Ok(hit);
        }

        let info = self.inner.token_pool_info(token_address).await?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(token_address.to_string(), info.clone());
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPools {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PoolInfoSource for CountingPools {
        async fn token_pool_info(&self, token_address: &str) -> Result<TokenPoolInfo, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token_address == "broken" {
                return Err(SourceError::Http {
                    provider: "fake",
                    message: "timeout".to_string(),
                });
            }
            Ok(TokenPoolInfo {
                token_address: token_address.to_string(),
                earliest_pool_creation_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            })
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let cache = CachedPoolInfo::new(CountingPools {
            calls: AtomicUsize::new(0),
        });

        let first = cache.token_pool_info("meme").await.unwrap();
        let second = cache.token_pool_info("meme").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_retried() {
        let cache = CachedPoolInfo::new(CountingPools {
            calls: AtomicUsize::new(0),
        });

        assert!(cache.token_pool_info("broken").await.is_err());
        assert!(cache.token_pool_info("broken").await.is_err());

        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
