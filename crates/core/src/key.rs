//! Lock key derivation.
//!
//! A key is the method identity followed by the JSON encoding of the selected
//! `[name, value]` pairs, for example `Worker#run:[["id","1"],["bar","\"x\""]]`.
//! Values are rendered with `Debug`, so two values sharing a rendering share a key.
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

use serde_json::Value;

use crate::error::ConfigError;
use crate::signature::{CallArguments, MethodSignature};
use crate::IntoNames;

/// Identity of one guarded call, as handed to the [`MutexStore`](crate::MutexStore).
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug)]
pub struct LockKey(String);

impl LockKey {
    /// Borrow the key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the underlying string.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for LockKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LockKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for LockKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LockKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Check that every name in `on` is a declared parameter of `signature`.
///
/// All unknown names are reported, in the order they appear in `on`.
pub fn validate(signature: &MethodSignature, on: &[String]) -> Result<(), ConfigError> {
    let unknown = on
        .iter()
        .filter(|name| !signature.contains(name))
        .cloned()
        .collect::<Vec<_>>();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::UnknownArguments(unknown))
    }
}

/// Builds [`LockKey`]s for one method from a validated selection of its parameters.
#[derive(Clone, Debug)]
pub struct KeyBuilder {
    signature: MethodSignature,
    on: Vec<String>,
}

impl KeyBuilder {
    /// Create a builder locking on the parameters named in `on`.
    ///
    /// An empty `on` locks on every parameter.
    pub fn new(signature: MethodSignature, on: impl IntoNames) -> Result<Self, ConfigError> {
        let on = on.into_names();
        validate(&signature, &on)?;
        Ok(Self { signature, on })
    }

    /// Create a builder whose `on` list was already checked, e.g. at compile time.
    #[doc(hidden)]
    pub fn prevalidated(signature: MethodSignature, on: impl IntoNames) -> Self {
        let on = on.into_names();
        debug_assert!(validate(&signature, &on).is_ok());
        Self { signature, on }
    }

    /// Signature the builder resolves names against.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Configured `on` names, empty meaning every parameter.
    #[inline]
    #[must_use]
    pub fn on(&self) -> &[String] {
        &self.on
    }

    /// Names that take part in the key, in key order.
    pub fn selected(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        if self.on.is_empty() {
            Box::new(self.signature.names())
        } else {
            Box::new(self.on.iter().map(String::as_str))
        }
    }

    /// Derive the key of a call to the method identified by `identity`.
    #[must_use]
    pub fn build(&self, identity: &str, args: &CallArguments<'_>) -> LockKey {
        let pairs = self
            .selected()
            .map(|name| {
                let value = self
                    .resolve(name, args)
                    .map_or(Value::Null, |value| Value::String(format!("{value:?}")));
                Value::Array(vec![Value::from(name), value])
            })
            .collect::<Vec<_>>();
        LockKey(format!("{identity}:{}", Value::Array(pairs)))
    }

    fn resolve<'a>(&self, name: &str, args: &CallArguments<'a>) -> Option<&'a dyn fmt::Debug> {
        self.signature
            .position_of(name)
            .and_then(|index| args.positional_value(index))
            .or_else(|| args.keyword_value(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Args;

    fn positional() -> KeyBuilder {
        KeyBuilder::new(MethodSignature::from_positional(["id", "foo", "bar"]), ["id", "bar"]).unwrap()
    }

    #[test]
    fn test_validate_reports_all_unknown() {
        let signature = MethodSignature::new(["id"], ["foo"]);
        assert!(validate(&signature, &[]).is_ok());
        assert!(validate(&signature, &["foo".to_owned(), "id".to_owned()]).is_ok());

        let err = KeyBuilder::new(signature, ["zed", "id", "missing_arg"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownArguments(vec!["zed".to_owned(), "missing_arg".to_owned()])
        );
    }

    #[test]
    fn test_build_format() {
        let builder = positional();
        let key = builder.build("Worker#run", &(1, "x", "obj").call_arguments());
        assert_eq!(key.as_str(), r#"Worker#run:[["id","1"],["bar","\"obj\""]]"#);
    }

    #[test]
    fn test_unselected_argument_does_not_change_key() {
        let builder = positional();
        let a = builder.build("Worker#run", &(1, "x", "obj").call_arguments());
        let b = builder.build("Worker#run", &(1, "y", "obj").call_arguments());
        assert_eq!(a, b);
        assert_eq!(a, builder.build("Worker#run", &(1, "x", "obj").call_arguments()));
    }

    #[test]
    fn test_selected_argument_changes_key() {
        let builder = positional();
        let a = builder.build("Worker#run", &(1, "x", "obj").call_arguments());
        assert_ne!(a, builder.build("Worker#run", &(2, "x", "obj").call_arguments()));
        assert_ne!(a, builder.build("Worker#run", &(1, "x", "other").call_arguments()));
        assert_ne!(a, builder.build("Worker#other", &(1, "x", "obj").call_arguments()));
    }

    #[test]
    fn test_textual_form_keeps_types_apart() {
        let builder = KeyBuilder::new(MethodSignature::from_positional(["id"]), Vec::<String>::new()).unwrap();
        let int = builder.build("m", &(1,).call_arguments());
        let string = builder.build("m", &("1",).call_arguments());
        assert_ne!(int, string);
    }

    #[test]
    fn test_empty_on_uses_all_names() {
        let builder = KeyBuilder::new(MethodSignature::new(["id"], ["mode"]), Vec::<String>::new()).unwrap();
        assert_eq!(builder.selected().collect::<Vec<_>>(), ["id", "mode"]);
        let id = 3;
        let mode = "fast";
        let key = builder.build("m", &CallArguments::new().arg(&id).kwarg("mode", &mode));
        assert_eq!(key.as_str(), r#"m:[["id","3"],["mode","\"fast\""]]"#);
    }

    #[test]
    fn test_keyword_arguments() {
        let builder = KeyBuilder::new(MethodSignature::from_keyword(["id", "foo", "bar"]), ["id", "bar"]).unwrap();
        let (id, foo, bar) = (1, "2", "obj");
        let a = builder.build("m", &CallArguments::new().kwarg("bar", &bar).kwarg("foo", &foo).kwarg("id", &id));
        let b = builder.build("m", &CallArguments::new().kwarg("id", &id).kwarg("bar", &bar));
        assert_eq!(a, b);

        let other = "other";
        let c = builder.build("m", &CallArguments::new().kwarg("id", &id).kwarg("bar", &other));
        assert_ne!(a, c);
    }

    #[test]
    fn test_missing_value_encodes_null() {
        let builder = positional();
        let id = 1;
        let key = builder.build("m", &CallArguments::new().arg(&id).skip());
        assert_eq!(key.as_str(), r#"m:[["id","1"],["bar",null]]"#);
    }
}
