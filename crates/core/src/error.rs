use std::error::Error as StdError;

use crate::key::LockKey;

/// Boxed error reported by a [`MutexStore`](crate::MutexStore) implementation.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Rejected guard configuration.
///
/// This signals a programming error in how a guard was declared, so it is raised
/// when the guard is built and never while a call is in flight.
#[derive(Eq, PartialEq, Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// `on` names arguments that the method does not declare, listed in `on` order.
    #[error("You are trying to lock on unknown arguments: {}", .0.join(", "))]
    UnknownArguments(Vec<String>),
}

/// Errors raised while a guarded call is in flight.
#[derive(Debug, thiserror::Error)]
pub enum MutexError {
    /// The lock is held by someone else and did not become free within `block`.
    #[error("failed to acquire lock `{key}`")]
    LockNotAcquired {
        /// Key the call tried to lock.
        key: LockKey,
    },
    /// The backing store itself failed, as opposed to simply being contended.
    #[error("mutex store unavailable: {0}")]
    StoreUnavailable(#[source] BoxedError),
}

impl MutexError {
    /// Create a `LockNotAcquired` error for `key`.
    #[inline]
    #[must_use]
    pub fn not_acquired(key: LockKey) -> Self {
        Self::LockNotAcquired { key }
    }

    /// Wrap a store failure.
    #[inline]
    pub fn store<E>(err: E) -> Self
    where
        E: Into<BoxedError>,
    {
        Self::StoreUnavailable(err.into())
    }

    /// Returns `true` if the lock was merely contended.
    #[inline]
    #[must_use]
    pub fn is_not_acquired(&self) -> bool {
        matches!(self, Self::LockNotAcquired { .. })
    }

    /// Returns `true` if the backing store failed.
    #[inline]
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
