use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::IntoNames;

/// Default time a call waits for a contended lock.
pub const DEFAULT_BLOCK: Duration = Duration::from_secs(1);

/// Per-method guard settings.
///
/// Settings can be built in code or deserialized, with `block` given in seconds:
///
/// ```
/// use std::time::Duration;
/// use automutex_core::GuardConfig;
///
/// let config: GuardConfig = serde_json::from_str(r#"{"block": 0.5, "on": ["id"]}"#).unwrap();
/// assert_eq!(config, GuardConfig::new().block(Duration::from_millis(500)).on(["id"]));
/// ```
#[non_exhaustive]
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct GuardConfig {
    /// How long to wait for a contended lock; zero means a single attempt.
    #[serde(with = "seconds")]
    pub block: Duration,
    /// Argument names forming the lock identity; empty means all arguments.
    pub on: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardConfig {
    /// Create a config with the default `block` that locks on every argument.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            block: DEFAULT_BLOCK,
            on: Vec::new(),
        }
    }

    /// Sets the maximum wait for a contended lock.
    #[inline]
    #[must_use]
    pub fn block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Sets the argument names the lock identity is made of.
    #[inline]
    #[must_use]
    pub fn on(mut self, names: impl IntoNames) -> Self {
        self.on = names.into_names();
        self
    }
}

mod seconds {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid block `{secs}`, expected non-negative seconds")))
    }
}
