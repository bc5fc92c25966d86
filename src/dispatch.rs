//! Uniform async dispatch into synchronous or asynchronous pipelines.
//!
//! The application pipeline declares its kind up front through [`Pipeline`].
//! Asynchronous pipelines are awaited in place; synchronous ones run on the
//! blocking thread pool so they never stall the task driving the transport.
//! Either way the caller sees one `async fn` returning a [`Response`].
//!
//! Errors and panics escaping the pipeline are offered to the configured
//! [`UncaughtErrorHandler`]. If there is none, or it fails too, a plain-text
//! 500 response is produced instead; that last step cannot fail.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use async_trait::async_trait;
use futures::FutureExt;
use log::error;

use crate::{
    error::PipelineError,
    failure::{Failure, PanicMessage},
    request::Request,
    response::Response,
    translate::fallback_response,
};

/// A pipeline that computes responses without blocking.
#[async_trait]
pub trait AsyncPipeline: Send + Sync {
    /// Produce the response for `request`.
    ///
    /// # Errors
    ///
    /// Any error is treated as an uncaught application failure.
    async fn call(&self, request: &mut Request) -> Result<Response, PipelineError>;
}

/// A pipeline that may block while computing responses.
pub trait SyncPipeline: Send + Sync {
    /// Produce the response for `request`.
    ///
    /// # Errors
    ///
    /// Any error is treated as an uncaught application failure.
    fn call(&self, request: &mut Request) -> Result<Response, PipelineError>;
}

impl<F> SyncPipeline for F
where
    F: Fn(&mut Request) -> Result<Response, PipelineError> + Send + Sync,
{
    fn call(&self, request: &mut Request) -> Result<Response, PipelineError> { self(request) }
}

/// Produces a response for a failure that escaped the pipeline.
pub trait UncaughtErrorHandler: Send + Sync {
    /// Build an error response for `failure` raised while serving `request`.
    ///
    /// # Errors
    ///
    /// An error (or panic) here falls back to the built-in 500 response.
    fn handle(&self, request: &Request, failure: &Failure) -> Result<Response, PipelineError>;
}

impl<F> UncaughtErrorHandler for F
where
    F: Fn(&Request, &Failure) -> Result<Response, PipelineError> + Send + Sync,
{
    fn handle(&self, request: &Request, failure: &Failure) -> Result<Response, PipelineError> {
        self(request, failure)
    }
}

/// An application pipeline tagged with its execution kind.
#[derive(Clone)]
pub enum Pipeline {
    /// Runs on the blocking thread pool.
    Sync(Arc<dyn SyncPipeline>),
    /// Awaited on the connection task.
    Async(Arc<dyn AsyncPipeline>),
}

impl Pipeline {
    /// Wrap a synchronous pipeline.
    pub fn sync(pipeline: impl SyncPipeline + 'static) -> Self { Self::Sync(Arc::new(pipeline)) }

    /// Wrap a synchronous closure.
    pub fn sync_fn<F>(f: F) -> Self
    where
        F: Fn(&mut Request) -> Result<Response, PipelineError> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous pipeline.
    pub fn asynchronous(pipeline: impl AsyncPipeline + 'static) -> Self {
        Self::Async(Arc::new(pipeline))
    }

    /// Whether this pipeline runs on the blocking thread pool.
    #[must_use]
    pub const fn is_sync(&self) -> bool { matches!(self, Self::Sync(_)) }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync(_) => "Pipeline::Sync(..)",
            Self::Async(_) => "Pipeline::Async(..)",
        })
    }
}

/// Invokes the pipeline and guarantees a response comes back.
#[derive(Clone)]
pub struct DispatchBridge {
    pipeline: Pipeline,
    error_handler: Option<Arc<dyn UncaughtErrorHandler>>,
    debug: bool,
}

impl fmt::Debug for DispatchBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchBridge")
            .field("pipeline", &self.pipeline)
            .field("error_handler", &self.error_handler.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

impl DispatchBridge {
    /// Bridge for `pipeline`, without an uncaught-error handler.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            error_handler: None,
            debug: false,
        }
    }

    /// Use `handler` for failures escaping the pipeline.
    #[must_use]
    pub fn error_handler(mut self, handler: impl UncaughtErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Include failure traces in fallback 500 responses.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// The wrapped pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }

    /// Run the pipeline for `request`.
    pub async fn dispatch(&self, request: Request) -> Response {
        let (request, outcome) = match &self.pipeline {
            Pipeline::Async(pipeline) => run_async(pipeline.as_ref(), request).await,
            Pipeline::Sync(pipeline) => {
                let pipeline = Arc::clone(pipeline);
                match tokio::task::spawn_blocking(move || run_sync(pipeline.as_ref(), request))
                    .await
                {
                    Ok(pair) => pair,
                    Err(join) => {
                        let failure = Failure::Join(join.to_string());
                        error!("synchronous pipeline task lost: failure={failure}");
                        tracing::error!(%failure, "synchronous pipeline task lost");
                        return fallback_response(&failure, self.debug);
                    }
                }
            }
        };
        match outcome {
            Ok(response) => response,
            Err(failure) => self.handle_uncaught(&request, &failure),
        }
    }

    fn handle_uncaught(&self, request: &Request, failure: &Failure) -> Response {
        error!(
            "uncaught pipeline failure: method={}, path={}, failure={failure}",
            request.method(),
            request.path()
        );
        tracing::error!(
            method = request.method(),
            path = request.path(),
            %failure,
            "uncaught pipeline failure"
        );
        if let Some(handler) = &self.error_handler {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(request, failure))) {
                Ok(Ok(response)) => return response,
                Ok(Err(handler_error)) => {
                    error!("uncaught-error handler failed: error={handler_error}");
                }
                Err(panic) => {
                    error!(
                        "uncaught-error handler panicked: panic={}",
                        PanicMessage::new(panic)
                    );
                }
            }
        }
        fallback_response(failure, self.debug)
    }
}

type Outcome = Result<Response, Failure>;

async fn run_async(pipeline: &dyn AsyncPipeline, mut request: Request) -> (Request, Outcome) {
    let result = AssertUnwindSafe(pipeline.call(&mut request))
        .catch_unwind()
        .await;
    (request, flatten(result))
}

fn run_sync(pipeline: &dyn SyncPipeline, mut request: Request) -> (Request, Outcome) {
    let result = catch_unwind(AssertUnwindSafe(|| pipeline.call(&mut request)));
    (request, flatten(result))
}

fn flatten(
    result: Result<Result<Response, PipelineError>, Box<dyn std::any::Any + Send>>,
) -> Outcome {
    match result {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(error)) => Err(Failure::Error(error)),
        Err(panic) => Err(Failure::Panic(PanicMessage::new(panic))),
    }
}
