//! Structured request built from a connection scope and its body.
//!
//! [`Request::build`] is a pure function of the scope and the fully received
//! body. Everything that can be derived cheaply (method, paths, metadata,
//! content type, content length) is computed up front; query parameters,
//! post data and cookies are parsed on first access and memoized.

pub mod content_type;
pub mod cookies;
pub mod form;
pub mod meta;
pub mod query;

use std::{borrow::Cow, cell::OnceCell, collections::BTreeMap, io::Cursor, sync::Arc};

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};

use self::{
    content_type::ContentType,
    form::{FormError, FormInput, FormParser, Files, PostData, UrlEncodedFormParser},
    meta::{CONTENT_LENGTH, CONTENT_TYPE, Headers},
    query::QueryDict,
};
use crate::{error::RequestError, scope::ConnectionScope};

/// Host and port reported when the scope has no client or server entry.
pub const UNKNOWN_HOST: &str = "unknown";
const UNKNOWN_PORT: &str = "0";

/// Decode `bytes` with exactly `encoding`.
///
/// A leading byte order mark stays in the text, except for UTF-16 where it
/// selects the byte order.
pub(crate) fn decode_text<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Cow<'a, str> {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        encoding.decode(bytes).0
    } else {
        encoding.decode_without_bom_handling(bytes).0
    }
}

/// Split a scope path into `(script_name, path_info, path)`.
///
/// `root_path` is stripped from the front of `path` when it is a prefix.
/// `path` joins the script name (trailing slashes removed) and the path info
/// (one leading slash removed) with a single `/`.
///
/// ```
/// use gateway_bridge::request::split_path;
///
/// let (script, info, path) = split_path("/app/", "/app/users/7");
/// assert_eq!(script, "/app/");
/// assert_eq!(info, "users/7");
/// assert_eq!(path, "/app/users/7");
/// ```
#[must_use]
pub fn split_path(root_path: &str, path: &str) -> (String, String, String) {
    if root_path.is_empty() {
        return (String::new(), path.to_owned(), path.to_owned());
    }
    let path_info = path.strip_prefix(root_path).unwrap_or(path);
    let joined = format!(
        "{}/{}",
        root_path.trim_end_matches('/'),
        path_info.strip_prefix('/').unwrap_or(path_info)
    );
    (root_path.to_owned(), path_info.to_owned(), joined)
}

/// A request ready for the application pipeline.
#[derive(Debug)]
pub struct Request {
    method: String,
    script_name: String,
    path_info: String,
    path: String,
    script_prefix: String,
    scheme: String,
    query_string: String,
    meta: BTreeMap<String, String>,
    content_type: ContentType,
    content_length: usize,
    encoding: &'static Encoding,
    body: Bytes,
    form_parser: Arc<dyn FormParser>,
    query: OnceCell<QueryDict>,
    form: OnceCell<Result<PostData, FormError>>,
    post_override: Option<QueryDict>,
    cookies: OnceCell<BTreeMap<String, String>>,
}

impl Request {
    /// Build a request from `scope` and its complete `body`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Decode`] if the scope carries a byte query
    /// string that is not valid UTF-8.
    pub fn build(scope: &ConnectionScope, body: Bytes) -> Result<Self, RequestError> {
        let root_path = scope.root_path.as_deref().unwrap_or("");
        let (script_name, path_info, path) = split_path(root_path, &scope.path);
        let method = scope.method.to_uppercase();
        let query_string = scope
            .query_string
            .decode()
            .map_err(|source| RequestError::Decode {
                field: "query_string",
                source,
            })?;

        let mut meta = BTreeMap::new();
        meta.insert("REQUEST_METHOD".to_owned(), method.clone());
        meta.insert("QUERY_STRING".to_owned(), query_string.clone());
        meta.insert("SCRIPT_NAME".to_owned(), script_name.clone());
        meta.insert("PATH_INFO".to_owned(), path_info.clone());
        let (remote_addr, remote_port) = endpoint_meta(scope.client.as_ref());
        meta.insert("REMOTE_HOST".to_owned(), remote_addr.clone());
        meta.insert("REMOTE_ADDR".to_owned(), remote_addr);
        meta.insert("REMOTE_PORT".to_owned(), remote_port);
        let (server_name, server_port) = endpoint_meta(scope.server.as_ref());
        meta.insert("SERVER_NAME".to_owned(), server_name);
        meta.insert("SERVER_PORT".to_owned(), server_port);
        for (name, value) in scope.headers.iter() {
            meta::insert_header(&mut meta, name, value);
        }

        let content_type = meta
            .get(CONTENT_TYPE)
            .map(|header| ContentType::parse(header))
            .unwrap_or_default();
        let encoding = content_type.charset().unwrap_or(encoding_rs::UTF_8);
        let content_length = meta
            .get(CONTENT_LENGTH)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);

        Ok(Self {
            method,
            script_prefix: script_name.clone(),
            script_name,
            path_info,
            path,
            scheme: scope.scheme.clone().unwrap_or_else(|| "http".to_owned()),
            query_string,
            meta,
            content_type,
            content_length,
            encoding,
            body,
            form_parser: Arc::new(UrlEncodedFormParser::default()),
            query: OnceCell::new(),
            form: OnceCell::new(),
            post_override: None,
            cookies: OnceCell::new(),
        })
    }

    /// Replace the form parser used for post data and files.
    #[must_use]
    pub fn with_form_parser(mut self, parser: Arc<dyn FormParser>) -> Self {
        self.form_parser = parser;
        self.form = OnceCell::new();
        self
    }

    /// Set the script prefix reported to the application.
    pub fn set_script_prefix(&mut self, prefix: impl Into<String>) {
        self.script_prefix = prefix.into();
    }

    /// Upper-cased HTTP method.
    #[must_use]
    pub fn method(&self) -> &str { &self.method }

    /// Mount point the request was routed through.
    #[must_use]
    pub fn script_name(&self) -> &str { &self.script_name }

    /// Path below the script name.
    #[must_use]
    pub fn path_info(&self) -> &str { &self.path_info }

    /// Full path as seen by the application.
    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// Prefix for URLs the application generates.
    #[must_use]
    pub fn script_prefix(&self) -> &str { &self.script_prefix }

    /// URL scheme (`http` unless the scope said otherwise).
    #[must_use]
    pub fn scheme(&self) -> &str { &self.scheme }

    /// Whether the request arrived over `https`.
    #[must_use]
    pub fn is_secure(&self) -> bool { self.scheme == "https" }

    /// Raw query string.
    #[must_use]
    pub fn query_string(&self) -> &str { &self.query_string }

    /// CGI-style metadata, including normalized headers.
    #[must_use]
    pub fn meta(&self) -> &BTreeMap<String, String> { &self.meta }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn headers(&self) -> Headers<'_> { Headers::new(&self.meta) }

    /// Value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> { self.headers().get(name) }

    /// Host the client addressed, falling back to the server endpoint.
    ///
    /// Default ports (`80` for http, `443` for https) are omitted.
    #[must_use]
    pub fn host(&self) -> String {
        if let Some(host) = self.header("host") {
            return host.to_owned();
        }
        let name = self.meta.get("SERVER_NAME").map_or(UNKNOWN_HOST, String::as_str);
        let port = self.meta.get("SERVER_PORT").map_or(UNKNOWN_PORT, String::as_str);
        let default_port = if self.is_secure() { "443" } else { "80" };
        if port == default_port {
            name.to_owned()
        } else {
            format!("{name}:{port}")
        }
    }

    /// Media type from the `Content-Type` header (empty when absent).
    #[must_use]
    pub fn content_type(&self) -> &str { &self.content_type.media_type }

    /// Parameters from the `Content-Type` header.
    #[must_use]
    pub fn content_params(&self) -> &BTreeMap<String, String> { &self.content_type.params }

    /// Declared body length; `0` when missing or invalid.
    #[must_use]
    pub const fn content_length(&self) -> usize { self.content_length }

    /// Encoding used to decode text fields.
    #[must_use]
    pub const fn encoding(&self) -> &'static Encoding { self.encoding }

    /// Switch the text encoding by label.
    ///
    /// Returns `false` and leaves the request untouched for unknown labels.
    /// On success memoized query parameters and post data are dropped so
    /// they are decoded again with the new encoding.
    pub fn set_encoding(&mut self, label: &str) -> bool {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            return false;
        };
        self.encoding = encoding;
        self.query.take();
        self.form.take();
        true
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Seekable reader over the body, positioned at the start.
    #[must_use]
    pub fn body_reader(&self) -> Cursor<Bytes> { Cursor::new(self.body.clone()) }

    /// Body decoded with [`Self::encoding`]; invalid sequences are replaced.
    #[must_use]
    pub fn text(&self) -> String {
        decode_text(self.encoding, &self.body).into_owned()
    }

    /// Query parameters, parsed on first access.
    pub fn query_params(&self) -> &QueryDict {
        self.query.get_or_init(|| {
            QueryDict::parse(
                self.query_string.as_bytes(),
                self.encoding.output_encoding(),
            )
        })
    }

    /// Form fields, parsed from the body on first access.
    ///
    /// # Errors
    ///
    /// Returns the [`FormError`] raised by the form parser; the same error is
    /// returned on every later call.
    pub fn post(&self) -> Result<&QueryDict, FormError> {
        if let Some(post) = &self.post_override {
            return Ok(post);
        }
        self.form_data().map(|data| &data.fields)
    }

    /// Replace the form fields seen by [`Self::post`].
    pub fn set_post(&mut self, post: QueryDict) { self.post_override = Some(post); }

    /// Uploaded files, parsed from the body on first access.
    ///
    /// # Errors
    ///
    /// Returns the [`FormError`] raised by the form parser.
    pub fn files(&self) -> Result<&Files, FormError> { self.form_data().map(|data| &data.files) }

    /// Cookies from the `Cookie` header, parsed on first access.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        self.cookies
            .get_or_init(|| cookies::parse_cookie(self.header("cookie").unwrap_or("")))
    }

    fn form_data(&self) -> Result<&PostData, FormError> {
        self.form
            .get_or_init(|| {
                self.form_parser.parse(FormInput {
                    body: &self.body,
                    content_type: &self.content_type,
                    encoding: self.encoding,
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn endpoint_meta(endpoint: Option<&(String, u16)>) -> (String, String) {
    endpoint.map_or_else(
        || (UNKNOWN_HOST.to_owned(), UNKNOWN_PORT.to_owned()),
        |(host, port)| (host.clone(), port.to_string()),
    )
}

#[cfg(test)]
mod tests;
