//! Structured cache keys.

use std::fmt;

/// A cache key: a name plus optional parameters, e.g. `("is-favorite", id)`.
///
/// A key matches a prefix when the prefix's parts are a leading run of its
/// parts, so `"public-profile"` matches `("public-profile", "u1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Append a parameter.
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }
}

impl From<&str> for QueryKey {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for QueryKey {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<(&str, &str)> for QueryKey {
    fn from((name, param): (&str, &str)) -> Self {
        Self(vec![name.to_string(), param.to_string()])
    }
}

impl From<(&str, String)> for QueryKey {
    fn from((name, param): (&str, String)) -> Self {
        Self(vec![name.to_string(), param])
    }
}

impl From<&QueryKey> for QueryKey {
    fn from(key: &QueryKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching() {
        let key = QueryKey::from(("public-profile", "u1"));
        assert!(key.starts_with(&QueryKey::from("public-profile")));
        assert!(key.starts_with(&key.clone()));
        assert!(!key.starts_with(&QueryKey::from("public-profile-audios")));
        assert!(!QueryKey::from("public-profile").starts_with(&key));
    }

    #[test]
    fn test_construction_forms_agree() {
        let a = QueryKey::from(("is-favorite", "t1"));
        let b = QueryKey::from(("is-favorite", "t1".to_string()));
        let c = QueryKey::new(["is-favorite", "t1"]);
        let d = QueryKey::from("is-favorite").with("t1");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert_eq!(a.to_string(), "is-favorite/t1");
    }
}
