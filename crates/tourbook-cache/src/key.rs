//! Deterministic cache key composition.

use std::fmt;

/// A cache key built from a logical resource name and every parameter that
/// shapes the result.
///
/// Parts are joined with `:` in the order they are added; an absent optional
/// part still occupies its slot, so `hotels:1:10::` and `hotels:1:10:name:`
/// never collide. `%` and `:` inside a part are percent-encoded, so a value
/// can never shift the part boundaries.
///
/// ```
/// use tourbook_cache::CacheKey;
///
/// let key = CacheKey::new("hotels")
///     .part(2)
///     .part(10)
///     .opt_part(Some("-rating"))
///     .opt_part(None::<&str>);
/// assert_eq!(key.to_string(), "hotels:2:10:-rating:");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
}

impl CacheKey {
    pub fn new(resource: &str) -> Self {
        Self {
            key: resource.to_string(),
        }
    }

    pub fn part(mut self, value: impl fmt::Display) -> Self {
        self.key.push(':');
        for c in value.to_string().chars() {
            match c {
                '%' => self.key.push_str("%25"),
                ':' => self.key.push_str("%3A"),
                c => self.key.push(c),
            }
        }
        self
    }

    pub fn opt_part<T: fmt::Display>(self, value: Option<T>) -> Self {
        match value {
            Some(v) => self.part(v),
            None => self.part(""),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}
