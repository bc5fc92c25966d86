//! Connection scope handed over by the gateway.
//!
//! A [`ConnectionScope`] is the immutable description of one inbound
//! connection: request line, addressing and headers. It is read once while
//! the request is built and never mutated afterwards.

use std::{collections::BTreeMap, str::Utf8Error};

use bytes::Bytes;

use crate::message::HeaderPair;

/// Scope type served by this adapter.
pub const HTTP_SCOPE: &str = "http";

/// Query string as delivered by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryString {
    /// Raw bytes; decoded as UTF-8 when the request is built.
    Bytes(Bytes),
    /// Already decoded text.
    Text(String),
}

impl Default for QueryString {
    fn default() -> Self { Self::Text(String::new()) }
}

impl QueryString {
    /// Decode the query string into text.
    ///
    /// # Errors
    ///
    /// Returns [`Utf8Error`] when raw bytes are not valid UTF-8.
    pub fn decode(&self) -> Result<String, Utf8Error> {
        match self {
            Self::Bytes(raw) => std::str::from_utf8(raw).map(str::to_owned),
            Self::Text(text) => Ok(text.clone()),
        }
    }
}

/// Headers in either wire form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeHeaders {
    /// Ordered `(name, value)` byte pairs; names are lowercase.
    Pairs(Vec<HeaderPair>),
    /// Older gateways send a name to value map.
    Legacy(BTreeMap<String, Bytes>),
}

impl Default for ScopeHeaders {
    fn default() -> Self { Self::Pairs(Vec::new()) }
}

impl ScopeHeaders {
    /// Headers as ordered byte pairs, converting the legacy form once.
    #[must_use]
    pub fn into_pairs(self) -> Vec<HeaderPair> {
        match self {
            Self::Pairs(pairs) => pairs,
            Self::Legacy(map) => map
                .into_iter()
                .map(|(name, value)| (Bytes::from(name.into_bytes()), value))
                .collect(),
        }
    }

    /// Iterate over the headers as byte slices.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_> {
        match self {
            Self::Pairs(pairs) => Box::new(
                pairs
                    .iter()
                    .map(|(name, value)| (name.as_ref(), value.as_ref())),
            ),
            Self::Legacy(map) => Box::new(
                map.iter()
                    .map(|(name, value)| (name.as_bytes(), value.as_ref())),
            ),
        }
    }
}

/// `(host, port)` pair for the client or server end of the connection.
pub type Endpoint = (String, u16);

/// Immutable metadata for one HTTP connection.
///
/// ```
/// use gateway_bridge::scope::ConnectionScope;
///
/// let scope = ConnectionScope::http("post", "/app/upload")
///     .root_path("/app")
///     .query_string("a=1")
///     .header("content-type", "text/plain");
/// assert_eq!(scope.method, "post");
/// assert_eq!(scope.declared_content_length(), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionScope {
    /// Scope type; only [`HTTP_SCOPE`] is served.
    pub kind: String,
    /// HTTP method as sent by the client.
    pub method: String,
    /// Full request path, including any root path.
    pub path: String,
    /// Mount point of the application, if any.
    pub root_path: Option<String>,
    /// Raw or decoded query string.
    pub query_string: QueryString,
    /// Client address.
    pub client: Option<Endpoint>,
    /// Server address.
    pub server: Option<Endpoint>,
    /// URL scheme (`http` when absent).
    pub scheme: Option<String>,
    /// Request headers.
    pub headers: ScopeHeaders,
}

impl ConnectionScope {
    /// Start an HTTP scope for `method` and `path`.
    #[must_use]
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: HTTP_SCOPE.to_owned(),
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the root path.
    #[must_use]
    pub fn root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }

    /// Set a textual query string.
    #[must_use]
    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = QueryString::Text(query.into());
        self
    }

    /// Set a raw byte query string.
    #[must_use]
    pub fn raw_query_string(mut self, query: impl Into<Bytes>) -> Self {
        self.query_string = QueryString::Bytes(query.into());
        self
    }

    /// Set the client endpoint.
    #[must_use]
    pub fn client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.client = Some((host.into(), port));
        self
    }

    /// Set the server endpoint.
    #[must_use]
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = Some((host.into(), port));
        self
    }

    /// Set the URL scheme.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Append a header pair, converting a legacy map to pairs first.
    #[must_use]
    pub fn header(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        let mut pairs = std::mem::take(&mut self.headers).into_pairs();
        pairs.push((name.into(), value.into()));
        self.headers = ScopeHeaders::Pairs(pairs);
        self
    }

    /// Whether this scope describes an HTTP connection.
    #[must_use]
    pub fn is_http(&self) -> bool { self.kind == HTTP_SCOPE }

    /// Content length declared by the client, `0` when missing or invalid.
    ///
    /// Repeated `content-length` headers are joined with `,` exactly as the
    /// request headers are, so they never parse as a length.
    #[must_use]
    pub fn declared_content_length(&self) -> usize {
        let values: Vec<&[u8]> = self
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(b"content-length"))
            .map(|(_, value)| value)
            .collect();
        std::str::from_utf8(&values.join(&b","[..]))
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_headers_convert_to_pairs() {
        let mut map = BTreeMap::new();
        map.insert("host".to_owned(), Bytes::from_static(b"example.com"));
        let pairs = ScopeHeaders::Legacy(map).into_pairs();
        assert_eq!(
            pairs,
            vec![(
                Bytes::from_static(b"host"),
                Bytes::from_static(b"example.com")
            )]
        );
    }

    #[test]
    fn declared_length_ignores_garbage() {
        let scope = ConnectionScope::http("GET", "/").header("content-length", "abc");
        assert_eq!(scope.declared_content_length(), 0);

        let scope = ConnectionScope::http("GET", "/").header("Content-Length", " 42 ");
        assert_eq!(scope.declared_content_length(), 42);

        let scope = ConnectionScope::http("GET", "/")
            .header("content-length", "5")
            .header("content-length", "5");
        assert_eq!(scope.declared_content_length(), 0);
    }

    #[test]
    fn raw_query_string_rejects_invalid_utf8() {
        let query = QueryString::Bytes(Bytes::from_static(b"a=\xff"));
        assert!(query.decode().is_err());
    }
}
