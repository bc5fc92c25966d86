//! `Content-Type` parsing and charset resolution.

use std::collections::BTreeMap;

use encoding_rs::Encoding;

/// Media type and parameters of a `Content-Type` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentType {
    /// Media type, trimmed but otherwise as sent.
    pub media_type: String,
    /// Parameters keyed by lower-cased name.
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    /// Parse a header value such as `text/html; charset="utf-8"`.
    ///
    /// Parameters without `=` are dropped. Quoted values lose their quotes
    /// and `\\` / `\"` escapes.
    ///
    /// ```
    /// use gateway_bridge::request::content_type::ContentType;
    ///
    /// let parsed = ContentType::parse(r#"multipart/form-data; boundary="a;b""#);
    /// assert_eq!(parsed.media_type, "multipart/form-data");
    /// assert_eq!(parsed.params.get("boundary").map(String::as_str), Some("a;b"));
    /// ```
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut parts = split_params(header).into_iter();
        let media_type = parts.next().unwrap_or_default().trim().to_owned();
        let params = parts
            .filter_map(|part| {
                let (name, value) = part.split_once('=')?;
                Some((name.trim().to_ascii_lowercase(), unquote(value.trim())))
            })
            .collect();
        Self { media_type, params }
    }

    /// Encoding named by the `charset` parameter, if it is one we support.
    #[must_use]
    pub fn charset(&self) -> Option<&'static Encoding> {
        let label = self.params.get("charset")?;
        let encoding = Encoding::for_label(label.as_bytes());
        if encoding.is_none() {
            log::debug!("ignoring unsupported request charset: charset={label}");
        }
        encoding
    }
}

/// Split on `;` outside double-quoted sections.
fn split_params(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (idx, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);
    parts
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\\", "\\").replace("\\\"", "\""),
        None => value.to_owned(),
    }
}
