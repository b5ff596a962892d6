use std::collections::BTreeMap;
use std::collections::btree_map;

/// String-to-string header map with case-insensitive names.
///
/// Names are normalized to lowercase on every access, so `Content-Type` and
/// `content-type` address the same entry. Iteration order is deterministic
/// (sorted by normalized name), which keeps dispatched requests comparable in
/// tests and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any previous value under the same name.
    ///
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(normalize(name.as_ref()), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize(name)).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&normalize(name))
    }

    /// Merge `other` into `self`; entries in `other` win on conflict.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.entries.insert(name.to_owned(), value.to_owned());
        }
    }

    /// Iterate over `(lowercase name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn insert_replaces_regardless_of_case() {
        let mut headers = Headers::new();
        headers.insert("X-Channel-Id", "first");
        let previous = headers.insert("x-channel-id", "second");

        assert_eq!(previous.as_deref(), Some("first"));
        assert_eq!(headers.get("X-CHANNEL-ID"), Some("second"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn extend_prefers_incoming_values() {
        let mut base: Headers = [("a", "1"), ("b", "2")].into_iter().collect();
        let other: Headers = [("B", "3"), ("c", "4")].into_iter().collect();

        base.extend(&other);

        let collected: Vec<_> = base.iter().collect();
        assert_eq!(collected, vec![("a", "1"), ("b", "3"), ("c", "4")]);
    }

    #[test]
    fn remove_is_case_insensitive() {
        let mut headers: Headers = [("Authorization", "Bearer x")].into_iter().collect();
        assert_eq!(headers.remove("AUTHORIZATION").as_deref(), Some("Bearer x"));
        assert!(headers.is_empty());
    }
}
