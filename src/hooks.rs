//! Request lifecycle callbacks.
//!
//! [`LifecycleHooks`] lets the embedding application observe when a request
//! starts being served and when its response has been sent and released.
//! Error responses for oversized, slow or malformed requests run both hooks
//! too; a client that disconnects before its body is complete runs neither.

use std::{fmt, sync::Arc};

use crate::scope::ConnectionScope;

/// Type alias for the `on_request_started` callback.
type RequestStartedHook = Arc<dyn Fn(&ConnectionScope) + Send + Sync + 'static>;

/// Type alias for the `on_request_finished` callback.
type RequestFinishedHook = Arc<dyn Fn() + Send + Sync + 'static>;

/// Callbacks run around each request.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    /// Invoked once body reception ends without a disconnect, before the
    /// request is built.
    pub on_request_started: Option<RequestStartedHook>,
    /// Invoked after the response close hooks have run.
    pub on_request_finished: Option<RequestFinishedHook>,
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_request_started", &self.on_request_started.is_some())
            .field("on_request_finished", &self.on_request_finished.is_some())
            .finish()
    }
}

impl LifecycleHooks {
    /// Register the `on_request_started` callback.
    #[must_use]
    pub fn request_started(
        mut self,
        hook: impl Fn(&ConnectionScope) + Send + Sync + 'static,
    ) -> Self {
        self.on_request_started = Some(Arc::new(hook));
        self
    }

    /// Register the `on_request_finished` callback.
    #[must_use]
    pub fn request_finished(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_request_finished = Some(Arc::new(hook));
        self
    }

    /// Run the `on_request_started` hook if registered.
    pub fn on_request_started(&self, scope: &ConnectionScope) {
        if let Some(hook) = &self.on_request_started {
            hook(scope);
        }
    }

    /// Run the `on_request_finished` hook if registered.
    pub fn on_request_finished(&self) {
        if let Some(hook) = &self.on_request_finished {
            hook();
        }
    }
}
