use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

/// Capability to claim and release named locks in a store shared by every contender.
///
/// Mutual exclusion across processes is only as strong as the store: a key may be
/// claimed by at most one holder at a time. Guards never inspect store state beyond
/// these two operations.
pub trait MutexStore: Send + Sync + 'static {
    /// Proof of ownership returned by a successful claim.
    ///
    /// A handle dropped without [`release`](Self::release), e.g. because the call was
    /// cancelled, should free its claim if the store can do so synchronously, or leave
    /// it to the store's expiry otherwise.
    type Handle: Send + Sync + 'static;
    /// Failure of the store itself, e.g. the backend being unreachable.
    type Error: StdError + Send + Sync + 'static;

    /// Try to claim `key`, waiting at most `wait` for it to become free.
    ///
    /// `Ok(None)` means the key stayed held by someone else; `wait` of zero means a
    /// single attempt.
    fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<Self::Handle>, Self::Error>> + Send;

    /// Give up a claim obtained from [`try_acquire`](Self::try_acquire).
    fn release(&self, handle: Self::Handle) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
