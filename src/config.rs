//! Adapter configuration.
//!
//! [`BridgeConfig`] is built once at startup and shared read-only by every
//! connection task. Nothing in the adapter consults ambient process state;
//! size ceilings, the receive timeout, the script-name override and the debug
//! flag all flow from this value.

use std::{num::NonZeroUsize, time::Duration};

/// Default ceiling for request bodies held in memory (2.5 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2_621_440;

/// Default size of each outbound body message (512 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Default time allowed for a client to finish uploading its body.
pub const DEFAULT_BODY_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

const fn non_zero(value: usize) -> NonZeroUsize {
    match NonZeroUsize::new(value) {
        Some(v) => v,
        None => panic!("default sizes are non-zero"),
    }
}

/// Immutable settings read by the adapter while serving requests.
///
/// ```
/// use std::{num::NonZeroUsize, time::Duration};
///
/// use gateway_bridge::config::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .max_body_size(NonZeroUsize::new(1024))
///     .body_receive_timeout(Duration::from_secs(5))
///     .debug(true);
/// assert_eq!(config.max_body_size_limit().map(NonZeroUsize::get), Some(1024));
/// assert!(config.is_debug());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    max_body_size: Option<NonZeroUsize>,
    body_receive_timeout: Duration,
    chunk_size: NonZeroUsize,
    file_chunk_size: NonZeroUsize,
    force_script_name: Option<String>,
    debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_body_size: Some(non_zero(DEFAULT_MAX_BODY_SIZE)),
            body_receive_timeout: DEFAULT_BODY_RECEIVE_TIMEOUT,
            chunk_size: non_zero(DEFAULT_CHUNK_SIZE),
            file_chunk_size: non_zero(DEFAULT_CHUNK_SIZE),
            force_script_name: None,
            debug: false,
        }
    }
}

impl BridgeConfig {
    /// Set the in-memory body ceiling. `None` disables the check.
    #[must_use]
    pub fn max_body_size(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Set how long a client may take to deliver its full body.
    #[must_use]
    pub fn body_receive_timeout(mut self, timeout: Duration) -> Self {
        self.body_receive_timeout = timeout;
        self
    }

    /// Set the maximum payload of one outbound body message.
    ///
    /// The file chunk size is raised to match when it would otherwise fall
    /// below the new value.
    #[must_use]
    pub fn chunk_size(mut self, size: NonZeroUsize) -> Self {
        self.chunk_size = size;
        self.file_chunk_size = self.file_chunk_size.max(size);
        self
    }

    /// Set the chunk size used for reader-backed (file) responses.
    ///
    /// Values below [`Self::chunk_size_limit`] are clamped up to it.
    #[must_use]
    pub fn file_chunk_size(mut self, size: NonZeroUsize) -> Self {
        self.file_chunk_size = size.max(self.chunk_size);
        self
    }

    /// Override the script prefix reported to the application.
    #[must_use]
    pub fn force_script_name(mut self, prefix: impl Into<String>) -> Self {
        self.force_script_name = Some(prefix.into());
        self
    }

    /// Expose failure traces in fallback 500 responses.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Configured body ceiling, if any.
    #[must_use]
    pub const fn max_body_size_limit(&self) -> Option<NonZeroUsize> { self.max_body_size }

    /// Configured receive timeout.
    #[must_use]
    pub const fn body_receive_timeout_limit(&self) -> Duration { self.body_receive_timeout }

    /// Maximum payload of one outbound body message.
    #[must_use]
    pub const fn chunk_size_limit(&self) -> NonZeroUsize { self.chunk_size }

    /// Maximum payload of one outbound body message for reader-backed bodies.
    #[must_use]
    pub const fn file_chunk_size_limit(&self) -> NonZeroUsize { self.file_chunk_size }

    /// Forced script prefix, if configured.
    #[must_use]
    pub fn forced_script_name(&self) -> Option<&str> { self.force_script_name.as_deref() }

    /// Whether debug detail is exposed in fallback error responses.
    #[must_use]
    pub const fn is_debug(&self) -> bool { self.debug }

    /// Script prefix for a request: the forced override, else `root_path`.
    #[must_use]
    pub fn script_prefix<'a>(&'a self, root_path: Option<&'a str>) -> &'a str {
        match self.forced_script_name() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => root_path.unwrap_or(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rstest::rstest;

    use super::*;

    fn nz(val: usize) -> NonZeroUsize { NonZeroUsize::new(val).expect("non-zero") }

    #[test]
    fn defaults_match_documented_values() {
        let config = BridgeConfig::default();
        assert_eq!(
            config.max_body_size_limit().map(NonZeroUsize::get),
            Some(DEFAULT_MAX_BODY_SIZE)
        );
        assert_eq!(config.body_receive_timeout_limit(), Duration::from_secs(60));
        assert_eq!(config.chunk_size_limit().get(), 512 * 1024);
        assert_eq!(config.file_chunk_size_limit().get(), 512 * 1024);
        assert!(!config.is_debug());
        assert_eq!(config.forced_script_name(), None);
    }

    #[test]
    fn file_chunk_size_cannot_drop_below_chunk_size() {
        let config = BridgeConfig::default()
            .chunk_size(nz(64))
            .file_chunk_size(nz(16));
        assert_eq!(config.file_chunk_size_limit().get(), 64);

        let raised = config.file_chunk_size(nz(4096));
        assert_eq!(raised.file_chunk_size_limit().get(), 4096);
    }

    #[test]
    fn raising_chunk_size_raises_file_chunk_size() {
        let config = BridgeConfig::default().chunk_size(nz(1024 * 1024));
        assert_eq!(config.file_chunk_size_limit().get(), 1024 * 1024);
    }

    #[rstest]
    #[case(None, Some("/app"), "/app")]
    #[case(None, None, "")]
    #[case(Some("/forced"), Some("/app"), "/forced")]
    #[case(Some(""), Some("/app"), "/app")]
    fn script_prefix_prefers_forced_name(
        #[case] forced: Option<&str>,
        #[case] root_path: Option<&str>,
        #[case] expected: &str,
    ) {
        let mut config = BridgeConfig::default();
        if let Some(prefix) = forced {
            config = config.force_script_name(prefix);
        }
        assert_eq!(config.script_prefix(root_path), expected);
    }
}
