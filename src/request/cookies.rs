//! `Cookie` request header parsing.

use std::collections::BTreeMap;

/// Parse a `Cookie` header into a name to value map.
///
/// Pairs are separated by `;`. Names and values are trimmed, quoted values
/// are unquoted, later duplicates replace earlier ones and a chunk without
/// `=` is stored under the empty name.
///
/// ```
/// use gateway_bridge::request::cookies::parse_cookie;
///
/// let cookies = parse_cookie(r#"sessionid=abc; theme="dark"; lone"#);
/// assert_eq!(cookies.get("sessionid").map(String::as_str), Some("abc"));
/// assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
/// assert_eq!(cookies.get("").map(String::as_str), Some("lone"));
/// ```
#[must_use]
pub fn parse_cookie(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for chunk in header.split(';') {
        let (name, value) = chunk.split_once('=').unwrap_or(("", chunk));
        let (name, value) = (name.trim(), value.trim());
        if !name.is_empty() || !value.is_empty() {
            cookies.insert(name.to_owned(), unquote(value));
        }
    }
    cookies
}

/// Strip surrounding quotes and resolve `\"`, `\\` and `\ooo` escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_owned();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let octal: String = std::iter::from_fn(|| chars.next_if(|d| ('0'..='7').contains(d)))
            .take(3)
            .collect();
        if octal.len() == 3
            && let Ok(code) = u8::from_str_radix(&octal, 8)
        {
            out.push(char::from(code));
        } else if octal.is_empty() {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push('\\');
            out.push_str(&octal);
        }
    }
    out
}
