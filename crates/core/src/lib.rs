//! The core lib of automutex: argument-scoped mutual exclusion backed by a shared lock store.
//!
//! Calls whose selected arguments resolve to the same [`LockKey`] run one at a time.
//! A contended call either waits up to its `block` bound or hands its arguments to a
//! fallback. The lock store is abstracted behind [`MutexStore`].
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::future_not_send)]
#![warn(rustdoc::broken_intra_doc_links)]

#[macro_use]
mod cfg;

mod auto_mutex;
mod config;
mod error;
pub mod guard;
pub mod key;
pub mod signature;
mod store;

cfg_feature! {
    #![feature = "memory-store"]

    mod memory_store;
    pub use memory_store::{MemoryLockHandle, MemoryMutex, DEFAULT_SLEEP};
}

pub use self::auto_mutex::AutoMutex;
pub use self::config::{GuardConfig, DEFAULT_BLOCK};
pub use self::error::{BoxedError, ConfigError, MutexError};
pub use self::guard::{with_lock, Guard, Lock};
pub use self::key::{KeyBuilder, LockKey};
pub use self::signature::{Args, CallArguments, MethodSignature};
pub use self::store::MutexStore;

/// A list of things that automatically imports into application use automutex_core.
pub mod prelude {
    pub use crate::{
        with_lock, Args, AutoMutex, CallArguments, Guard, GuardConfig, LockKey, MethodSignature, MutexError,
        MutexStore,
    };
    cfg_feature! {
        #![feature = "memory-store"]
        pub use crate::MemoryMutex;
    }
}

#[doc(hidden)]
pub mod __private {
    use std::future::Future;

    /// Pins the output type of a generated body so `?` inside it resolves.
    #[inline]
    pub fn body<R, F>(fut: F) -> F
    where
        F: Future<Output = R>,
    {
        fut
    }
}

/// Converts a list of names into owned strings.
pub trait IntoNames {
    /// Collect the names.
    fn into_names(self) -> Vec<String>;
}

impl IntoNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}
impl IntoNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}
impl<const N: usize> IntoNames for [&str; N] {
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}
impl<T> IntoNames for Vec<T>
where
    T: Into<String>,
{
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}
impl<T> IntoNames for &[T]
where
    T: AsRef<str>,
{
    fn into_names(self) -> Vec<String> {
        self.iter().map(|name| name.as_ref().to_owned()).collect()
    }
}
