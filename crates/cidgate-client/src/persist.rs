//! Cache access from async code.
//!
//! [`CacheStore`] methods do synchronous file I/O under the index mutex, so
//! every call made on behalf of an async operation runs on the blocking
//! pool instead of a runtime worker.

use std::sync::Arc;

use cidgate_store::{CacheError, CacheStore};

use crate::error::PersistError;

/// Run `op` against `cache` on the blocking pool.
pub(crate) async fn run<T, F>(cache: &Arc<CacheStore>, op: F) -> Result<T, PersistError>
where
    F: FnOnce(&CacheStore) -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(cache);
    let result = tokio::task::spawn_blocking(move || op(&cache)).await?;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidgate_core::{Cid, ManualClock, Timestamp};
    use cidgate_store::{CacheConfig, MemoryKvStore};

    fn store() -> Arc<CacheStore> {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
        let kv = Arc::new(MemoryKvStore::new());
        Arc::new(CacheStore::open(kv, CacheConfig::default(), clock).unwrap())
    }

    #[tokio::test]
    async fn runs_cache_calls_off_the_runtime_worker() {
        let cache = store();
        let cid = Cid::new("QmA").unwrap();
        let key = cid.clone();
        run(&cache, move |c| c.insert(&key, b"abc")).await.unwrap();
        let key = cid.clone();
        let blob = run(&cache, move |c| c.get(&key)).await.unwrap();
        assert_eq!(blob.as_deref(), Some(&b"abc"[..]));
    }

    #[tokio::test]
    async fn panicking_task_becomes_an_error() {
        let cache = store();
        let err = run(&cache, |_| -> Result<(), CacheError> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::Task(_)));
    }
}
