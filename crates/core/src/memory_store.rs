use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::store::MutexStore;

/// Default interval between two claim attempts while waiting.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug)]
struct Holder {
    token: Uuid,
    acquired_at: Instant,
}

/// Handle of a lock claimed in a [`MemoryMutex`].
///
/// Dropping a handle that was never passed to `release` frees its claim, so a
/// cancelled call does not leave its key locked.
pub struct MemoryLockHandle {
    key: String,
    token: Uuid,
    locks: Arc<Mutex<HashMap<String, Holder>>>,
    released: bool,
}

impl MemoryLockHandle {
    /// Key this handle holds.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove the claim if it is still ours; `false` if it was expired and taken over.
    fn unlock(&mut self) -> bool {
        self.released = true;
        let mut locks = self.locks.lock();
        let ours = locks.get(&self.key).is_some_and(|holder| holder.token == self.token);
        if ours {
            locks.remove(&self.key);
        }
        ours
    }
}

impl fmt::Debug for MemoryLockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLockHandle")
            .field("key", &self.key)
            .field("token", &self.token)
            .finish()
    }
}

impl Drop for MemoryLockHandle {
    fn drop(&mut self) {
        if !self.released && self.unlock() {
            tracing::debug!(key = %self.key, "lock freed by dropped handle");
        }
    }
}

/// A process-local lock store.
///
/// Clones share the same locks, so one store can be handed to every guard that
/// must exclude the others. Waiting contenders poll every [`sleep`](Self::sleep).
#[derive(Clone, Debug)]
pub struct MemoryMutex {
    locks: Arc<Mutex<HashMap<String, Holder>>>,
    sleep: Duration,
    expire: Option<Duration>,
}

impl Default for MemoryMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMutex {
    /// Create an empty store whose locks never expire.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            sleep: DEFAULT_SLEEP,
            expire: None,
        }
    }

    /// Sets the interval between claim attempts while waiting.
    #[must_use]
    pub fn sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// Treat a lock held longer than `expire` as abandoned.
    #[must_use]
    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    /// Returns `true` if `key` is currently held.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        let now = Instant::now();
        self.locks
            .lock()
            .get(key)
            .is_some_and(|holder| !self.is_expired(holder, now))
    }

    /// Remove expired locks, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, holder| !self.is_expired(holder, now));
        before - locks.len()
    }

    fn is_expired(&self, holder: &Holder, now: Instant) -> bool {
        self.expire
            .is_some_and(|expire| now.saturating_duration_since(holder.acquired_at) >= expire)
    }

    fn try_claim(&self, key: &str) -> Option<MemoryLockHandle> {
        let now = Instant::now();
        let mut locks = self.locks.lock();
        if let Some(holder) = locks.get(key) {
            if !self.is_expired(holder, now) {
                return None;
            }
            tracing::debug!(key, "reclaiming expired lock");
        }
        let token = Uuid::new_v4();
        locks.insert(
            key.to_owned(),
            Holder {
                token,
                acquired_at: now,
            },
        );
        Some(MemoryLockHandle {
            key: key.to_owned(),
            token,
            locks: self.locks.clone(),
            released: false,
        })
    }
}

impl MutexStore for MemoryMutex {
    type Handle = MemoryLockHandle;
    type Error = Infallible;

    async fn try_acquire(&self, key: &str, wait: Duration) -> Result<Option<Self::Handle>, Self::Error> {
        let deadline = Instant::now().checked_add(wait);
        loop {
            if let Some(handle) = self.try_claim(key) {
                return Ok(Some(handle));
            }
            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => return Ok(None),
                Some(deadline) => self.sleep.min(deadline - now),
                None => self.sleep,
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn release(&self, mut handle: Self::Handle) -> Result<(), Self::Error> {
        if !handle.unlock() {
            tracing::warn!(key = %handle.key, "lock expired and was taken over before release");
        }
        Ok(())
    }
}
