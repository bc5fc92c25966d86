//! Per-connection entry point of the adapter.
//!
//! [`GatewayHandler::handle`] serves one HTTP connection scope end to end:
//! it receives the body, builds the [`Request`], dispatches it through the
//! pipeline and encodes the response back onto the transport. Failures
//! before dispatch are translated by [`crate::translate`]; a client that
//! disconnects early gets no response at all.

use std::sync::Arc;

use log::{debug, warn};
use tokio::time::Instant;

use crate::{
    config::BridgeConfig,
    dispatch::{DispatchBridge, Pipeline},
    encoder::ResponseEncoder,
    error::HandlerError,
    hooks::LifecycleHooks,
    receiver::BodyReceiver,
    request::{Request, form::FormParser},
    response::Response,
    scope::ConnectionScope,
    transport::Transport,
    translate::{self, Outcome},
};

/// Serves HTTP connection scopes through an application pipeline.
///
/// ```
/// use gateway_bridge::{
///     config::BridgeConfig,
///     dispatch::Pipeline,
///     handler::GatewayHandler,
///     response::Response,
/// };
///
/// let handler = GatewayHandler::new(
///     BridgeConfig::default(),
///     Pipeline::sync_fn(|request| Ok(Response::text(200, request.path()))),
/// );
/// assert!(!handler.config().is_debug());
/// ```
#[derive(Clone, Debug)]
pub struct GatewayHandler {
    config: BridgeConfig,
    receiver: BodyReceiver,
    encoder: ResponseEncoder,
    bridge: DispatchBridge,
    hooks: LifecycleHooks,
    form_parser: Option<Arc<dyn FormParser>>,
}

impl GatewayHandler {
    /// Handler for `pipeline` using the limits and flags in `config`.
    #[must_use]
    pub fn new(config: BridgeConfig, pipeline: Pipeline) -> Self {
        let bridge = DispatchBridge::new(pipeline).debug(config.is_debug());
        Self::with_bridge(config, bridge)
    }

    /// Handler around a preconfigured dispatch bridge.
    ///
    /// The bridge keeps its own debug flag.
    #[must_use]
    pub fn with_bridge(config: BridgeConfig, bridge: DispatchBridge) -> Self {
        Self {
            receiver: BodyReceiver::from_config(&config),
            encoder: ResponseEncoder::from_config(&config),
            config,
            bridge,
            hooks: LifecycleHooks::default(),
            form_parser: None,
        }
    }

    /// Run `hooks` around every request.
    #[must_use]
    pub fn hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Parse post data with `parser` instead of the url-encoded default.
    #[must_use]
    pub fn form_parser(mut self, parser: Arc<dyn FormParser>) -> Self {
        self.form_parser = Some(parser);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig { &self.config }

    /// Dispatch bridge used for every request.
    #[must_use]
    pub fn bridge(&self) -> &DispatchBridge { &self.bridge }

    /// Serve one connection described by `scope`.
    ///
    /// Exactly one response is sent unless the request is aborted.
    ///
    /// # Errors
    ///
    /// - [`HandlerError::UnsupportedScope`] for a non-HTTP scope; nothing is received or sent.
    /// - [`HandlerError::Aborted`] if the client disconnected or the transport failed while the
    ///   body was received; nothing is sent.
    /// - [`HandlerError::Send`] if the response could not be encoded or sent.
    pub async fn handle<T>(&self, scope: ConnectionScope, transport: &mut T) -> Result<(), HandlerError>
    where
        T: Transport + ?Sized,
    {
        if !scope.is_http() {
            warn!("rejecting unsupported connection scope: kind={}", scope.kind);
            return Err(HandlerError::UnsupportedScope(scope.kind));
        }
        let started = Instant::now();

        let received = match self
            .receiver
            .receive(transport, scope.declared_content_length(), started)
            .await
        {
            Ok(body) => Ok(body),
            Err(error) => match translate::body_error(error) {
                Outcome::Abort(error) => {
                    debug!(
                        "request aborted before dispatch: method={}, path={}",
                        scope.method, scope.path
                    );
                    return Err(HandlerError::Aborted(error));
                }
                Outcome::Respond(response) => Err(response),
            },
        };

        self.hooks.on_request_started(&scope);
        let response = match received {
            Ok(body) => match Request::build(&scope, body) {
                Ok(request) => self.bridge.dispatch(self.prepare(request, &scope)).await,
                Err(error) => translate::request_error(&error),
            },
            Err(response) => response,
        };
        let result = self.send(response, transport).await;
        self.hooks.on_request_finished();
        result
    }

    fn prepare(&self, request: Request, scope: &ConnectionScope) -> Request {
        let mut request = match &self.form_parser {
            Some(parser) => request.with_form_parser(Arc::clone(parser)),
            None => request,
        };
        let prefix = self.config.script_prefix(scope.root_path.as_deref());
        request.set_script_prefix(prefix);
        request
    }

    async fn send<T>(&self, response: Response, transport: &mut T) -> Result<(), HandlerError>
    where
        T: Transport + ?Sized,
    {
        let status = response.status();
        self.encoder
            .send_response(response, transport)
            .await
            .map_err(|error| {
                warn!("failed to send response: status={status}, error={error}");
                HandlerError::Send(error)
            })
    }
}
