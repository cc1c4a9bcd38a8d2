//! Automutex runs async functions one call at a time per set of arguments.
//!
//! Put `#[auto_mutex]` on an `async fn` and calls whose selected arguments render the
//! same are serialized through a shared [`MutexStore`]:
//!
//! ```
//! use std::sync::LazyLock;
//!
//! use automutex::prelude::*;
//!
//! static LOCKS: LazyLock<MemoryMutex> = LazyLock::new(MemoryMutex::new);
//!
//! #[auto_mutex(store = &*LOCKS, block = 0, on(account), after_failure = skipped)]
//! async fn settle(account: u64, amount: i64) -> Result<String, MutexError> {
//!     Ok(format!("settled {amount} on {account}"))
//! }
//!
//! async fn skipped(account: u64, _amount: i64) -> Result<String, MutexError> {
//!     Ok(format!("{account} is busy"))
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! assert_eq!(settle(7, 10).await.unwrap(), "settled 10 on 7");
//! # }
//! ```
//!
//! Without the macro, [`AutoMutex`] wraps a closure the same way and [`with_lock`]
//! guards a single block under an explicit key.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::future_not_send)]

pub use automutex_core as core;
#[doc(no_inline)]
pub use automutex_core::*;
pub use automutex_macros::auto_mutex;

/// A list of things that automatically imports into application use automutex.
pub mod prelude {
    pub use automutex_core::prelude::*;
    pub use automutex_macros::auto_mutex;
}
