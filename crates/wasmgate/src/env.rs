//! Per-invocation environment handed to the guest as its process environment.

use std::collections::{BTreeMap, btree_map};

use crate::error::{Error, Result};

/// Request path.
pub const HTTP_PATH: &str = "http_path";
/// Request method.
pub const HTTP_METHOD: &str = "http_method";
/// Request host.
pub const HTTP_HOST: &str = "http_host";
/// Form-urlencoded query string.
pub const HTTP_QUERY: &str = "http_query";
/// Peer address as `ip:port`.
pub const REMOTE_ADDR: &str = "remote_addr";

/// Keys a guest invoked through the HTTP dispatcher can rely on.
pub const REQUEST_KEYS: [&str; 5] = [HTTP_PATH, HTTP_METHOD, HTTP_HOST, HTTP_QUERY, REMOTE_ADDR];

/// String-to-string mapping with unique keys. Iteration order is by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Checks every entry can be encoded as a WASI `key=value\0` string.
    ///
    /// # Errors
    /// Returns [`Error::InvalidEnvironment`] for the first offending entry.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.0 {
            let reason = if key.is_empty() {
                Some("empty key")
            } else if key.contains('=') {
                Some("key contains '='")
            } else if key.contains('\0') {
                Some("key contains NUL")
            } else if value.contains('\0') {
                Some("value contains NUL")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(Error::InvalidEnvironment {
                    key: key.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_replaces_value() {
        let env = Environment::new()
            .with(HTTP_QUERY, "number=1")
            .with(HTTP_QUERY, "number=2");
        assert_eq!(env.len(), 1);
        assert_eq!(env.get(HTTP_QUERY), Some("number=2"));
    }

    #[test]
    fn iteration_is_sorted_by_key() {
        let env: Environment = [("b", "2"), ("a", "1")].into_iter().collect();
        let keys: Vec<_> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn validate_rejects_unencodable_entries() {
        assert!(Environment::new().with("k", "v=w").validate().is_ok());

        for env in [
            Environment::new().with("", "v"),
            Environment::new().with("a=b", "v"),
            Environment::new().with("k", "v\0"),
        ] {
            let err = env.validate().expect_err("entry must be rejected");
            assert!(matches!(err, Error::InvalidEnvironment { .. }), "{err}");
        }
    }
}
