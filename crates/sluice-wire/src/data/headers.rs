use std::mem;

/// Value of one header name: a single string or an ordered list.
///
/// Repeated response headers fold into a [`HeaderValue::List`] in arrival
/// order. On the request side a list is written as one header line per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    List(Vec<String>),
}

impl HeaderValue {
    /// First value, or the empty string for an empty list.
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(value) => value,
            HeaderValue::List(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValue::Single(value) => std::slice::from_ref(value),
            HeaderValue::List(values) => values,
        };
        values.iter().map(String::as_str)
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(first) => {
                let first = mem::take(first);
                *self = HeaderValue::List(vec![first, value]);
            }
            HeaderValue::List(values) => values.push(value),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self { HeaderValue::Single(value.to_string()) }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self { HeaderValue::Single(value) }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self { HeaderValue::List(values) }
}

impl From<&[&str]> for HeaderValue {
    fn from(values: &[&str]) -> Self {
        HeaderValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered header mapping with unique, case-insensitive names.
///
/// Names keep the spelling they were first inserted with; lookups ignore
/// ASCII case.
///
/// # Examples
///
/// ```
/// use sluice_wire::{HeaderValue, Headers};
///
/// let mut headers = Headers::new();
/// headers.append("set-cookie", "a=1");
/// headers.append("Set-Cookie", "b=2");
///
/// let cookies: Vec<&str> = headers.get("SET-COOKIE").unwrap().iter().collect();
/// assert_eq!(cookies, ["a=1", "b=2"]);
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    pub fn new() -> Self { Self::default() }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Set `name` to `value`, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Option<HeaderValue> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => Some(mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Add one value for `name`, folding repeats into an ordered list.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, HeaderValue::Single(value))),
        }
    }

    /// Builder form of [`Headers::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.position(name).map(|idx| &self.entries[idx].1)
    }

    /// First value of `name`.
    pub fn get_str(&self, name: &str) -> Option<&str> { self.get(name).map(HeaderValue::first) }

    pub fn contains(&self, name: &str) -> bool { self.position(name).is_some() }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}
