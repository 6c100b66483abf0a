//! Key header matching.
//!
//! A key header is any stored header line starting with `<name>:` for one of
//! the configured names, compared ASCII case-insensitively. Its value is a
//! list of keys separated by ASCII whitespace.

/// Matches stored header lines against the configured key header names.
#[derive(Clone, Debug)]
pub struct HeaderMatcher {
    prefixes: Vec<String>,
}

impl HeaderMatcher {
    /// Build a matcher for `names` (without the trailing colon).
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            prefixes: names.iter().map(|n| format!("{}:", n.as_ref())).collect(),
        }
    }

    /// The value of `line` if it is a key header.
    pub fn value<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.prefixes.iter().find_map(|prefix| {
            let head = line.as_bytes().get(..prefix.len())?;
            if head.eq_ignore_ascii_case(prefix.as_bytes()) {
                line.get(prefix.len()..)
            } else {
                None
            }
        })
    }

    /// Values of every key header among `headers`, in header order.
    pub fn values<'a>(&'a self, headers: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        headers.iter().filter_map(move |line| self.value(line))
    }
}

/// Split a key header value into keys.
pub fn split_keys(value: &str) -> impl Iterator<Item = &str> {
    value.split_ascii_whitespace()
}
