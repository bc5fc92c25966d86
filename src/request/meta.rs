//! CGI-style metadata keys for request headers.
//!
//! Header names are normalized once when the request is built:
//! `content-length` and `content-type` map to dedicated keys, every other
//! header becomes `HTTP_` followed by the upper-cased name with `-` replaced
//! by `_`.

use std::collections::BTreeMap;

/// Key holding the request's `Content-Length` header.
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";

/// Key holding the request's `Content-Type` header.
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";

/// Decode bytes as latin-1. Every byte maps to one `char`, so this never fails.
#[must_use]
pub fn latin1(bytes: &[u8]) -> String { bytes.iter().copied().map(char::from).collect() }

/// Metadata key for a header name.
///
/// ```
/// use gateway_bridge::request::meta::meta_key;
///
/// assert_eq!(meta_key("Content-Type"), "CONTENT_TYPE");
/// assert_eq!(meta_key("x-forwarded-for"), "HTTP_X_FORWARDED_FOR");
/// ```
#[must_use]
pub fn meta_key(name: &str) -> String {
    if name.eq_ignore_ascii_case("content-length") {
        CONTENT_LENGTH.to_owned()
    } else if name.eq_ignore_ascii_case("content-type") {
        CONTENT_TYPE.to_owned()
    } else {
        let mut key = String::with_capacity(name.len() + 5);
        key.push_str("HTTP_");
        key.extend(name.chars().map(|c| match c {
            '-' => '_',
            other => other.to_ascii_uppercase(),
        }));
        key
    }
}

/// Insert a header value, joining repeats with `,` in arrival order.
pub(crate) fn insert_header(meta: &mut BTreeMap<String, String>, name: &[u8], value: &[u8]) {
    let key = meta_key(&latin1(name));
    let value = latin1(value);
    meta.entry(key)
        .and_modify(|existing| {
            existing.push(',');
            existing.push_str(&value);
        })
        .or_insert(value);
}

/// Case-insensitive view over the request headers.
#[derive(Clone, Copy, Debug)]
pub struct Headers<'a> {
    meta: &'a BTreeMap<String, String>,
}

impl<'a> Headers<'a> {
    pub(crate) fn new(meta: &'a BTreeMap<String, String>) -> Self { Self { meta } }

    /// Value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.meta.get(&meta_key(name)).map(String::as_str)
    }

    /// Whether header `name` was sent.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.meta.contains_key(&meta_key(name)) }

    /// Iterate over `(name, value)` with names in `Title-Case` form.
    pub fn iter(&self) -> impl Iterator<Item = (String, &'a str)> + 'a {
        self.meta.iter().filter_map(|(key, value)| {
            header_name(key).map(|name| (name, value.as_str()))
        })
    }
}

fn header_name(key: &str) -> Option<String> {
    let raw = match key {
        CONTENT_LENGTH | CONTENT_TYPE => key,
        _ => key.strip_prefix("HTTP_")?,
    };
    let title = raw
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join("-");
    Some(title)
}
