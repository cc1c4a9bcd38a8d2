//! The macros lib of automutex.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use syn::{Item, parse_macro_input};

mod attr;
mod auto_mutex;
mod shared;

/// `auto_mutex` serializes calls of an `async fn` that resolve to the same lock key.
///
/// The key is made of the function identity and the `Debug` rendering of the
/// arguments named in `on` (all arguments when `on` is omitted). When the lock stays
/// held by another call for longer than `block` seconds, `after_failure` is called
/// with the very same arguments and its result is returned instead. Without
/// `after_failure` the call fails with `MutexError::LockNotAcquired`.
///
/// The function must return `Result<T, E>` where `E: From<MutexError>`, and may be a
/// free function or a method taking `&self`.
///
/// ```ignore
/// use automutex::prelude::*;
///
/// struct Exporter {
///     locks: MemoryMutex,
/// }
///
/// impl Exporter {
///     #[auto_mutex(store = &self.locks, block = 0, on(id), after_failure = Self::busy)]
///     async fn export(&self, id: u64, format: &str) -> Result<String, MutexError> {
///         Ok(format!("exported {id} as {format}"))
///     }
///
///     async fn busy(&self, id: u64, _format: &str) -> Result<String, MutexError> {
///         Ok(format!("export of {id} already running"))
///     }
/// }
/// ```
///
/// Options:
///
/// - `store = <expr>`: required, an expression of type `&impl MutexStore`.
/// - `block = <seconds>`: maximum wait for a contended lock, `0` for a single attempt.
/// - `on(<name>, ...)`: arguments forming the identity; unknown names fail to compile.
/// - `after_failure = <expr>`: fallback called as `(<expr>)(args...).await`.
/// - `name = "<identity>"`: overrides the default `Type#method` or `module::fn` identity.
#[proc_macro_attribute]
pub fn auto_mutex(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as attr::AutoMutexArgs);
    let item = parse_macro_input!(input as Item);
    match auto_mutex::generate(args, item) {
        Ok(stream) => stream.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
