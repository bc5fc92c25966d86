//! Responses produced by the application pipeline.
//!
//! A [`Response`] carries a status, ordered headers, cookies and one of three
//! body kinds: an in-memory buffer, a stream of byte parts, or an
//! [`AsyncRead`] source such as an open file. Close hooks registered with
//! [`Response::on_close`] run exactly once when the response is dropped or
//! explicitly closed, whichever happens first.

use std::{fmt, io, pin::Pin};

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::AsyncRead;

use crate::cookie::Cookie;

/// Type-erased stream of body parts.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Type-erased reader backing a file-like body.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send + 'static>>;

type CloseHook = Box<dyn FnOnce() + Send + 'static>;

/// Body of a [`Response`].
pub enum ResponseBody {
    /// A complete in-memory body.
    Full(Bytes),
    /// Lazily produced body parts.
    Stream(BodyStream),
    /// A reader drained in file-sized chunks.
    Reader(BodyReader),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(bytes).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Releases response resources once, on explicit close or on drop.
#[derive(Default)]
#[must_use]
pub struct CloseGuard {
    hooks: Vec<CloseHook>,
}

impl CloseGuard {
    /// Run the close hooks now.
    pub fn close(self) { drop(self); }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        for hook in self.hooks.drain(..) {
            hook();
        }
    }
}

impl fmt::Debug for CloseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseGuard")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Status line, headers and cookies of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Headers in insertion order, names cased as provided.
    pub headers: Vec<(String, String)>,
    /// Cookies to emit as `Set-Cookie` headers.
    pub cookies: Vec<Cookie>,
}

/// Response handed back by the application pipeline.
///
/// ```
/// use gateway_bridge::response::Response;
///
/// let response = Response::text(404, "missing").header("X-Trace", "abc");
/// assert_eq!(response.status(), 404);
/// assert_eq!(response.header_value("content-type"), Some("text/plain; charset=utf-8"));
/// assert!(!response.is_streaming());
/// ```
#[derive(Debug)]
#[must_use]
pub struct Response {
    head: ResponseHead,
    body: ResponseBody,
    guard: CloseGuard,
}

impl Response {
    /// Response with an empty body and no headers.
    pub fn new(status: u16) -> Self { Self::with_body(status, ResponseBody::Full(Bytes::new())) }

    /// Plain UTF-8 text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, ResponseBody::Full(Bytes::from(body.into())))
            .header("Content-Type", "text/plain; charset=utf-8")
    }

    /// Response with a complete in-memory body.
    pub fn bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self::with_body(status, ResponseBody::Full(body.into()))
    }

    /// Streaming response producing body parts from `parts`.
    pub fn stream<S>(status: u16, parts: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::with_body(status, ResponseBody::Stream(Box::pin(parts)))
    }

    /// Streaming response over an in-memory sequence of parts.
    pub fn from_parts<I>(status: u16, parts: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self::stream(status, stream::iter(parts.into_iter().map(Ok)))
    }

    /// File-like response read from `reader`.
    pub fn reader<R>(status: u16, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::with_body(status, ResponseBody::Reader(Box::pin(reader)))
    }

    fn with_body(status: u16, body: ResponseBody) -> Self {
        Self {
            head: ResponseHead {
                status,
                headers: Vec::new(),
                cookies: Vec::new(),
            },
            body,
            guard: CloseGuard::default(),
        }
    }

    /// Append a header. Repeated names are kept in order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.headers.push((name.into(), value.into()));
        self
    }

    /// Replace every header called `name` (case-insensitive) with one value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.head
            .headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.head.headers.push((name, value.into()));
    }

    /// Add a cookie.
    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.head.cookies.push(cookie);
        self
    }

    /// Register a hook to run once the response has been sent or dropped.
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.guard.hooks.push(Box::new(hook));
        self
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 { self.head.status }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] { &self.head.headers }

    /// First value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.head
            .headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Cookies to be set.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] { &self.head.cookies }

    /// Whether the body is produced incrementally.
    #[must_use]
    pub fn is_streaming(&self) -> bool { !matches!(self.body, ResponseBody::Full(_)) }

    /// In-memory body, if the response has one.
    #[must_use]
    pub fn content(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Full(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Run the close hooks and discard the response.
    pub fn close(self) { self.guard.close(); }

    /// Split into head, body and the guard that runs the close hooks.
    pub fn into_parts(self) -> (ResponseHead, ResponseBody, CloseGuard) {
        (self.head, self.body, self.guard)
    }
}
