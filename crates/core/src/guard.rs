//! The acquire, run, release protocol.
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use futures_util::FutureExt;

use crate::config::GuardConfig;
use crate::error::{ConfigError, MutexError};
use crate::key::{KeyBuilder, LockKey};
use crate::signature::{CallArguments, MethodSignature};
use crate::store::MutexStore;

/// Validated key selection plus wait bound for one guarded method.
#[derive(Clone, Debug)]
pub struct Guard {
    keys: KeyBuilder,
    block: Duration,
}

impl Guard {
    /// Create a guard, rejecting `on` names missing from `signature`.
    pub fn new(signature: MethodSignature, config: GuardConfig) -> Result<Self, ConfigError> {
        let GuardConfig { block, on } = config;
        Ok(Self {
            keys: KeyBuilder::new(signature, on)?,
            block,
        })
    }

    #[doc(hidden)]
    pub fn prevalidated(signature: MethodSignature, config: GuardConfig) -> Self {
        let GuardConfig { block, on } = config;
        Self {
            keys: KeyBuilder::prevalidated(signature, on),
            block,
        }
    }

    /// Key builder of this guard.
    #[inline]
    #[must_use]
    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Maximum wait for a contended lock.
    #[inline]
    #[must_use]
    pub fn block(&self) -> Duration {
        self.block
    }

    /// Derive the key of a call to the method identified by `identity`.
    #[inline]
    #[must_use]
    pub fn key(&self, identity: &str, args: &CallArguments<'_>) -> LockKey {
        self.keys.build(identity, args)
    }

    /// Try to claim `key` within this guard's `block`.
    ///
    /// `Ok(None)` means the lock stayed contended.
    pub async fn acquire<'s, S>(&self, store: &'s S, key: &LockKey) -> Result<Option<Lock<'s, S>>, MutexError>
    where
        S: MutexStore,
    {
        acquire(store, key, self.block).await
    }
}

async fn acquire<'s, S>(store: &'s S, key: &LockKey, block: Duration) -> Result<Option<Lock<'s, S>>, MutexError>
where
    S: MutexStore,
{
    match store.try_acquire(key.as_str(), block).await {
        Ok(Some(handle)) => {
            tracing::debug!(key = %key, "lock acquired");
            Ok(Some(Lock {
                store,
                key: key.clone(),
                handle: Some(handle),
            }))
        }
        Ok(None) => {
            tracing::debug!(key = %key, block = ?block, "lock contended");
            Ok(None)
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "mutex store failed to acquire");
            Err(MutexError::store(e))
        }
    }
}

/// A claimed lock.
///
/// Use [`run`](Self::run) to execute the guarded body; it releases the lock on every
/// exit path before handing back the outcome.
pub struct Lock<'s, S>
where
    S: MutexStore,
{
    store: &'s S,
    key: LockKey,
    handle: Option<S::Handle>,
}

impl<S> Debug for Lock<'_, S>
where
    S: MutexStore,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("held", &self.handle.is_some())
            .finish()
    }
}

impl<S> Lock<'_, S>
where
    S: MutexStore,
{
    /// Key this lock holds.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Run `body` while holding the lock, then release it.
    ///
    /// A body error or panic is surfaced after the release. A release failure only
    /// replaces the outcome when the body succeeded.
    pub async fn run<F, T, E>(mut self, body: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<MutexError>,
    {
        let outcome = AssertUnwindSafe(body).catch_unwind().await;
        let released = self.release_held().await;
        match outcome {
            Ok(Ok(value)) => {
                released?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(release_err) = released {
                    tracing::error!(key = %self.key, error = %release_err, "release failed after body error");
                }
                Err(e)
            }
            Err(cause) => {
                if let Err(release_err) = released {
                    tracing::error!(key = %self.key, error = %release_err, "release failed after body panic");
                }
                panic::resume_unwind(cause)
            }
        }
    }

    /// Release the lock without running anything.
    pub async fn release(mut self) -> Result<(), MutexError> {
        self.release_held().await
    }

    async fn release_held(&mut self) -> Result<(), MutexError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match self.store.release(handle).await {
            Ok(()) => {
                tracing::debug!(key = %self.key, "lock released");
                Ok(())
            }
            Err(e) => Err(MutexError::store(e)),
        }
    }
}

impl<S> Drop for Lock<'_, S>
where
    S: MutexStore,
{
    fn drop(&mut self) {
        if self.handle.is_some() {
            tracing::warn!(key = %self.key, "lock dropped while held, its handle is dropped without release");
        }
    }
}

/// Run `body` under the raw `key`, waiting at most `block` for it.
///
/// Unlike a [`Guard`], no key is derived; contention fails with
/// [`MutexError::LockNotAcquired`].
pub async fn with_lock<S, F, T, E>(store: &S, key: impl Into<LockKey>, block: Duration, body: F) -> Result<T, E>
where
    S: MutexStore,
    F: Future<Output = Result<T, E>>,
    E: From<MutexError>,
{
    let key = key.into();
    match acquire(store, &key, block).await? {
        Some(lock) => lock.run(body).await,
        None => Err(MutexError::not_acquired(key).into()),
    }
}

#[cfg(all(test, feature = "memory-store"))]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_test::traced_test;

    use super::*;
    use crate::MemoryMutex;
    use crate::signature::Args;

    #[derive(Debug)]
    struct DownStore;

    impl MutexStore for DownStore {
        type Handle = ();
        type Error = io::Error;

        async fn try_acquire(&self, _key: &str, _wait: Duration) -> Result<Option<()>, io::Error> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
        }

        async fn release(&self, _handle: ()) -> Result<(), io::Error> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
        }
    }

    #[derive(Debug)]
    struct FlakyReleaseStore;

    impl MutexStore for FlakyReleaseStore {
        type Handle = ();
        type Error = io::Error;

        async fn try_acquire(&self, _key: &str, _wait: Duration) -> Result<Option<()>, io::Error> {
            Ok(Some(()))
        }

        async fn release(&self, _handle: ()) -> Result<(), io::Error> {
            Err(io::Error::other("lost connection"))
        }
    }

    fn guard() -> Guard {
        Guard::new(
            MethodSignature::from_positional(["id"]),
            GuardConfig::new().block(Duration::ZERO),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_unknown_names() {
        let err = Guard::new(
            MethodSignature::from_positional(["id"]),
            GuardConfig::new().on(["missing_arg"]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "You are trying to lock on unknown arguments: missing_arg");
    }

    #[tokio::test]
    async fn test_run_releases_after_success() {
        let store = MemoryMutex::new();
        let guard = guard();
        let key = guard.key("jobs", &(1,).call_arguments());

        let lock = guard.acquire(&store, &key).await.unwrap().unwrap();
        assert!(guard.acquire(&store, &key).await.unwrap().is_none());
        let value: Result<u32, MutexError> = lock.run(async { Ok(5) }).await;
        assert_eq!(value.unwrap(), 5);
        assert!(!store.is_locked(key.as_str()));
    }

    #[tokio::test]
    async fn test_run_releases_after_body_error() {
        let store = MemoryMutex::new();
        let guard = guard();
        let key = guard.key("jobs", &(1,).call_arguments());

        let lock = guard.acquire(&store, &key).await.unwrap().unwrap();
        let result: Result<(), MutexError> = lock.run(async { Err(MutexError::store(io::Error::other("boom"))) }).await;
        assert_eq!(result.unwrap_err().to_string(), "mutex store unavailable: boom");
        assert!(guard.acquire(&store, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_releases_after_panic() {
        let store = MemoryMutex::new();
        let guard = guard();
        let key = guard.key("jobs", &(1,).call_arguments());

        let lock = guard.acquire(&store, &key).await.unwrap().unwrap();
        let caught = AssertUnwindSafe(lock.run(async {
            if key.as_str().is_empty() {
                return Ok::<(), MutexError>(());
            }
            panic!("body exploded")
        }))
        .catch_unwind()
        .await;
        assert!(caught.is_err());
        assert!(!store.is_locked(key.as_str()));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_contention() {
        let guard = guard();
        let key = guard.key("jobs", &(1,).call_arguments());
        let err = guard.acquire(&DownStore, &key).await.unwrap_err();
        assert!(err.is_store_unavailable());

        let ran = AtomicUsize::new(0);
        let result: Result<(), MutexError> = with_lock(&DownStore, "jobs", Duration::ZERO, async {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_store_unavailable());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_release_failure() {
        let result: Result<u8, MutexError> = with_lock(&FlakyReleaseStore, "jobs", Duration::ZERO, async { Ok(1) }).await;
        assert!(result.unwrap_err().is_store_unavailable());

        let result: Result<u8, MutexError> = with_lock(&FlakyReleaseStore, "jobs", Duration::ZERO, async {
            Err(MutexError::not_acquired(LockKey::from("inner")))
        })
        .await;
        assert!(result.unwrap_err().is_not_acquired());
        assert!(logs_contain("release failed after body error"));
    }

    #[tokio::test]
    async fn test_with_lock_contended() {
        let store = MemoryMutex::new();
        let held = store.try_acquire("jobs", Duration::ZERO).await.unwrap().unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let result: Result<(), MutexError> = with_lock(&store, "jobs", Duration::ZERO, async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;
        match result {
            Err(MutexError::LockNotAcquired { key }) => assert_eq!(key.as_str(), "jobs"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        store.release(held).await.unwrap();
        let result: Result<(), MutexError> = with_lock(&store, "jobs", Duration::ZERO, async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_dropped_lock_warns() {
        let store = MemoryMutex::new();
        let lock = acquire(&store, &LockKey::from("jobs"), Duration::ZERO).await.unwrap().unwrap();
        drop(lock);
        assert!(logs_contain("lock dropped while held"));
        assert!(!store.is_locked("jobs"));

        let lock = acquire(&store, &LockKey::from("other"), Duration::ZERO).await.unwrap().unwrap();
        lock.release().await.unwrap();
        assert!(!store.is_locked("other"));
    }
}
