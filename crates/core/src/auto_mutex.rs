use std::fmt::{self, Debug, Formatter};
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::GuardConfig;
use crate::error::{ConfigError, MutexError};
use crate::guard::Guard;
use crate::signature::{Args, MethodSignature};
use crate::store::MutexStore;

type BoxedFn<A, T, E> = Box<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// A callable wrapped so that calls resolving to the same key run one at a time.
///
/// ```
/// use std::time::Duration;
/// use automutex_core::{AutoMutex, GuardConfig, MemoryMutex, MethodSignature, MutexError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let render = AutoMutex::new(
///     "Report#render",
///     MethodSignature::from_positional(["id"]),
///     GuardConfig::new().block(Duration::ZERO),
///     MemoryMutex::new(),
///     |(id,): (u64,)| async move { Ok::<_, MutexError>(format!("success: {id}")) },
/// )?
/// .after_failure(|(id,): (u64,)| async move { Ok(format!("failure: {id}")) });
///
/// assert_eq!(render.call((1,)).await?, "success: 1");
/// # Ok(())
/// # }
/// ```
pub struct AutoMutex<S, A, T, E> {
    identity: String,
    guard: Guard,
    store: S,
    body: BoxedFn<A, T, E>,
    after_failure: Option<BoxedFn<A, T, E>>,
}

impl<S, A, T, E> Debug for AutoMutex<S, A, T, E>
where
    S: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoMutex")
            .field("identity", &self.identity)
            .field("guard", &self.guard)
            .field("store", &self.store)
            .field("after_failure", &self.after_failure.is_some())
            .finish()
    }
}

impl<S, A, T, E> AutoMutex<S, A, T, E>
where
    S: MutexStore,
    A: Args + Send + 'static,
    T: Send + 'static,
    E: From<MutexError> + Send + 'static,
{
    /// Wrap `body`, identified by `identity`, behind a guard built from `signature` and `config`.
    ///
    /// Fails if `config.on` names an argument `signature` does not declare.
    pub fn new<B, Fut>(
        identity: impl Into<String>,
        signature: MethodSignature,
        config: GuardConfig,
        store: S,
        body: B,
    ) -> Result<Self, ConfigError>
    where
        B: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let guard = Guard::new(signature, config)?;
        Ok(Self {
            identity: identity.into(),
            guard,
            store,
            body: Box::new(move |args| body(args).boxed()),
            after_failure: None,
        })
    }

    /// Sets the fallback invoked with the original arguments when the lock is contended.
    ///
    /// Without a fallback, contention fails the call with [`MutexError::LockNotAcquired`].
    #[must_use]
    pub fn after_failure<F, Fut>(mut self, fallback: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.after_failure = Some(Box::new(move |args| fallback(args).boxed()));
        self
    }

    /// Identity prefixed to every key.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Guard deriving keys for this callable.
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Store locks are claimed in.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Invoke the wrapped callable.
    pub async fn call(&self, args: A) -> Result<T, E> {
        let key = self.guard.key(&self.identity, &args.call_arguments());
        match self.guard.acquire(&self.store, &key).await? {
            Some(lock) => lock.run((self.body)(args)).await,
            None => match &self.after_failure {
                Some(fallback) => {
                    tracing::debug!(key = %key, "running fallback");
                    fallback(args).await
                }
                None => Err(MutexError::not_acquired(key).into()),
            },
        }
    }
}
