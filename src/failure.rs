//! Uncaught pipeline failures.
//!
//! A [`Failure`] is either an error returned by the application or a panic
//! caught while running it. Both render a human-readable trace used by the
//! debug-mode fallback response.

use std::{any::Any, fmt, fmt::Write as _};

use crate::error::PipelineError;

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to a placeholder otherwise.
///
/// ```
/// use gateway_bridge::failure::PanicMessage;
///
/// assert_eq!(PanicMessage::new(Box::new("boom")).to_string(), "boom");
/// assert_eq!(PanicMessage::new(Box::new(5_u32)).to_string(), "non-string panic payload");
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// Wrap a payload returned by `catch_unwind`.
    pub fn new(payload: Box<dyn Any + Send>) -> Self { Self(payload) }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            f.write_str("non-string panic payload")
        }
    }
}

/// Why the application pipeline failed to produce a response.
#[derive(Debug)]
pub enum Failure {
    /// The pipeline returned an error.
    Error(PipelineError),
    /// The pipeline panicked.
    Panic(PanicMessage),
    /// The execution context running a synchronous pipeline was lost.
    Join(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => write!(f, "{error}"),
            Self::Panic(message) => write!(f, "panic: {message}"),
            Self::Join(reason) => write!(f, "pipeline task failed: {reason}"),
        }
    }
}

impl Failure {
    /// Multi-line trace: the failure followed by its error sources.
    #[must_use]
    pub fn trace(&self) -> String {
        let mut out = format!("Traceback:\n{self}");
        if let Self::Error(error) = self {
            let mut source = error.source();
            while let Some(cause) = source {
                let _ = write!(out, "\nCaused by: {cause}");
                source = cause.source();
            }
        }
        out
    }
}
