//! Declared parameter names and the concrete values of one call.
use std::fmt::{self, Debug, Formatter};

use indexmap::IndexMap;

use crate::IntoNames;

/// Ordered parameter names of a guarded method, captured once when the guard is built.
#[derive(Eq, PartialEq, Clone, Default, Debug)]
pub struct MethodSignature {
    positional: Vec<String>,
    keyword: Vec<String>,
}

impl MethodSignature {
    /// Create a signature from positional and keyword parameter names.
    #[inline]
    pub fn new(positional: impl IntoNames, keyword: impl IntoNames) -> Self {
        Self {
            positional: positional.into_names(),
            keyword: keyword.into_names(),
        }
    }

    /// Create a signature that only has positional parameters.
    #[inline]
    pub fn from_positional(names: impl IntoNames) -> Self {
        Self {
            positional: names.into_names(),
            keyword: Vec::new(),
        }
    }

    /// Create a signature that only has keyword parameters.
    #[inline]
    pub fn from_keyword(names: impl IntoNames) -> Self {
        Self {
            positional: Vec::new(),
            keyword: names.into_names(),
        }
    }

    /// Positional parameter names in declaration order.
    #[inline]
    #[must_use]
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Keyword parameter names in declaration order.
    #[inline]
    #[must_use]
    pub fn keyword(&self) -> &[String] {
        &self.keyword
    }

    /// All parameter names, positional first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.positional
            .iter()
            .chain(self.keyword.iter())
            .map(String::as_str)
    }

    /// Index of `name` among the positional parameters.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.positional.iter().position(|n| n == name)
    }

    /// Returns `true` if `name` is a declared parameter.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }
}

/// Borrowed view over the values of one call.
///
/// Values are held as `&dyn Debug`; their `Debug` rendering is what ends up in the lock key.
/// A positional slot may be [`skip`](Self::skip)ped when its value never takes part in the key.
#[derive(Default)]
pub struct CallArguments<'a> {
    positional: Vec<Option<&'a dyn Debug>>,
    keyword: IndexMap<&'a str, &'a dyn Debug>,
}

impl<'a> CallArguments<'a> {
    /// Create an empty argument list.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next positional value.
    #[inline]
    #[must_use]
    pub fn arg(mut self, value: &'a dyn Debug) -> Self {
        self.positional.push(Some(value));
        self
    }

    /// Append a positional slot without exposing its value.
    #[inline]
    #[must_use]
    pub fn skip(mut self) -> Self {
        self.positional.push(None);
        self
    }

    /// Bind a keyword value.
    #[inline]
    #[must_use]
    pub fn kwarg(mut self, name: &'a str, value: &'a dyn Debug) -> Self {
        self.keyword.insert(name, value);
        self
    }

    /// Value of the positional slot at `index`, if supplied.
    #[must_use]
    pub fn positional_value(&self, index: usize) -> Option<&'a dyn Debug> {
        self.positional.get(index).copied().flatten()
    }

    /// Value bound to keyword `name`, if supplied.
    #[must_use]
    pub fn keyword_value(&self, name: &str) -> Option<&'a dyn Debug> {
        self.keyword.get(name).copied()
    }

    /// Number of positional slots, skipped ones included.
    #[inline]
    #[must_use]
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }
}

impl Debug for CallArguments<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallArguments")
            .field("positional", &self.positional)
            .field("keyword", &self.keyword)
            .finish()
    }
}

/// Types whose values can be exposed as [`CallArguments`].
///
/// Tuples map to positional arguments. Argument structs standing in for keyword
/// arguments implement this by hand:
///
/// ```
/// use automutex_core::{Args, CallArguments};
///
/// struct Render {
///     id: u64,
///     theme: String,
/// }
///
/// impl Args for Render {
///     fn call_arguments(&self) -> CallArguments<'_> {
///         CallArguments::new()
///             .kwarg("id", &self.id)
///             .kwarg("theme", &self.theme)
///     }
/// }
/// ```
pub trait Args {
    /// Borrow the values of this call.
    fn call_arguments(&self) -> CallArguments<'_>;
}

impl Args for () {
    fn call_arguments(&self) -> CallArguments<'_> {
        CallArguments::new()
    }
}

macro_rules! impl_args_for_tuple {
    ($($T:ident $idx:tt),+) => {
        impl<$($T: Debug),+> Args for ($($T,)+) {
            fn call_arguments(&self) -> CallArguments<'_> {
                CallArguments::new()$(.arg(&self.$idx))+
            }
        }
    };
}

impl_args_for_tuple!(A 0);
impl_args_for_tuple!(A 0, B 1);
impl_args_for_tuple!(A 0, B 1, C 2);
impl_args_for_tuple!(A 0, B 1, C 2, D 3);
impl_args_for_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_args_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_args_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_args_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_names() {
        let signature = MethodSignature::new(["id", "foo"], ["bar"]);
        assert_eq!(signature.names().collect::<Vec<_>>(), ["id", "foo", "bar"]);
        assert_eq!(signature.position_of("foo"), Some(1));
        assert_eq!(signature.position_of("bar"), None);
        assert!(signature.contains("bar"));
        assert!(!signature.contains("baz"));

        let signature = MethodSignature::from_keyword(vec!["id".to_owned()]);
        assert!(signature.positional().is_empty());
        assert_eq!(signature.keyword(), ["id"]);
    }

    #[test]
    fn test_call_arguments_slots() {
        let id = 7_u64;
        let name = "tom";
        let args = CallArguments::new().arg(&id).skip().kwarg("name", &name);
        assert_eq!(args.positional_len(), 2);
        assert_eq!(format!("{:?}", args.positional_value(0).unwrap()), "7");
        assert!(args.positional_value(1).is_none());
        assert!(args.positional_value(2).is_none());
        assert_eq!(format!("{:?}", args.keyword_value("name").unwrap()), "\"tom\"");
        assert!(args.keyword_value("id").is_none());
    }

    #[test]
    fn test_tuple_args() {
        let args = (1_u8, "x", 'c');
        let call = args.call_arguments();
        assert_eq!(call.positional_len(), 3);
        assert_eq!(format!("{:?}", call.positional_value(2).unwrap()), "'c'");
        assert_eq!(().call_arguments().positional_len(), 0);
    }
}
