//! Multi-valued parameter maps for query strings and url-encoded forms.

use std::collections::{BTreeMap, btree_map};

use encoding_rs::Encoding;
use percent_encoding::percent_decode;

use super::decode_text;

/// Ordered multi-map of decoded parameters.
///
/// [`QueryDict::get`] returns the last value for a key, matching how most
/// clients expect repeated scalar parameters to behave; [`QueryDict::get_all`]
/// returns every value in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryDict {
    entries: BTreeMap<String, Vec<String>>,
}

impl QueryDict {
    /// Empty parameter map.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Parse `application/x-www-form-urlencoded` bytes.
    ///
    /// `+` decodes to a space, percent escapes decode to bytes which are then
    /// decoded with `encoding` (invalid sequences are replaced). Fields without
    /// `=` keep an empty value.
    ///
    /// ```
    /// use gateway_bridge::request::query::QueryDict;
    ///
    /// let query = QueryDict::parse(b"a=1&a=2&b=hello+world&flag", encoding_rs::UTF_8);
    /// assert_eq!(query.get("a"), Some("2"));
    /// assert_eq!(query.get_all("a"), ["1", "2"]);
    /// assert_eq!(query.get("b"), Some("hello world"));
    /// assert_eq!(query.get("flag"), Some(""));
    /// ```
    #[must_use]
    pub fn parse(input: &[u8], encoding: &'static Encoding) -> Self {
        let mut dict = Self::new();
        for (name, value) in fields(input) {
            dict.append(decode(name, encoding), decode(value, encoding));
        }
        dict
    }

    /// Number of url-encoded fields in `input`.
    #[must_use]
    pub fn count_fields(input: &[u8]) -> usize { fields(input).count() }

    /// Append `value` under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Last value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Every value for `key`, in arrival order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool { self.entries.contains_key(key) }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Iterate over keys and their values.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> { self.entries.iter() }
}

impl<K, V> FromIterator<(K, V)> for QueryDict
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.append(key, value);
        }
        dict
    }
}

fn fields(input: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    input
        .split(|&b| b == b'&')
        .filter(|field| !field.is_empty())
        .map(|field| match field.iter().position(|&b| b == b'=') {
            Some(idx) => (&field[..idx], &field[idx + 1..]),
            None => (field, &field[field.len()..]),
        })
}

fn decode(raw: &[u8], encoding: &'static Encoding) -> String {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    let bytes: Vec<u8> = percent_decode(&spaced).collect();
    decode_text(encoding, &bytes).into_owned()
}
