//! Merging of `Set-Cookie` headers from many individual responses.
//!
//! Two cookies are the same cookie when name, domain (case-insensitive) and
//! path match. The most recently merged value wins.

use std::collections::HashMap;

/// Identity of a cookie: `name \0 lowercased-domain \0 path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CookieKey(String);

impl CookieKey {
    pub fn new(name: &str, domain: Option<&str>, path: Option<&str>) -> Self {
        Self(format!(
            "{}\u{0}{}\u{0}{}",
            name,
            domain.map(str::to_ascii_lowercase).unwrap_or_default(),
            path.unwrap_or_default()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A parsed `Set-Cookie` header that keeps its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    raw: String,
}

impl SetCookie {
    /// Parse a `Set-Cookie` header value. Returns `None` without a `name=value` pair.
    pub fn parse(header: &str) -> Option<Self> {
        let mut segments = header.split(';');
        let (name, value) = segments.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut domain = None;
        let mut path = None;
        for attribute in segments {
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attribute.trim(), ""),
            };
            if key.eq_ignore_ascii_case("domain") && !val.is_empty() {
                domain = Some(val.to_string());
            } else if key.eq_ignore_ascii_case("path") && !val.is_empty() {
                path = Some(val.to_string());
            }
        }

        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain,
            path,
            raw: header.trim().to_string(),
        })
    }

    pub fn key(&self) -> CookieKey {
        CookieKey::new(&self.name, self.domain.as_deref(), self.path.as_deref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The header value as originally emitted.
    pub fn as_header(&self) -> &str {
        &self.raw
    }
}

/// Last-write-wins set of cookies keyed by [`CookieKey`].
#[derive(Debug, Default)]
pub struct CookieMerger {
    cookies: HashMap<CookieKey, (u64, SetCookie)>,
    sequence: u64,
}

impl CookieMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one response's `Set-Cookie` values, in order.
    pub fn merge<I, S>(&mut self, set_cookie_headers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for header in set_cookie_headers {
            let Some(cookie) = SetCookie::parse(header.as_ref()) else {
                tracing::debug!(header = header.as_ref(), "Dropping unparsable Set-Cookie header");
                continue;
            };
            self.sequence += 1;
            self.cookies.insert(cookie.key(), (self.sequence, cookie));
        }
    }

    pub fn get(&self, key: &CookieKey) -> Option<&SetCookie> {
        self.cookies.get(key).map(|(_, cookie)| cookie)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Merged cookies ordered by when each was last written.
    pub fn into_cookies(self) -> Vec<SetCookie> {
        let mut cookies: Vec<_> = self.cookies.into_values().collect();
        cookies.sort_by_key(|(sequence, _)| *sequence);
        cookies.into_iter().map(|(_, cookie)| cookie).collect()
    }
}
