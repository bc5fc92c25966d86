//! Integration tests for failure translation and request lifecycle hooks.

use std::{
    fmt, io,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use gateway_bridge::{
    AsyncPipeline,
    BridgeConfig,
    ConnectionScope,
    DispatchBridge,
    GatewayHandler,
    HandlerError,
    LifecycleHooks,
    Pipeline,
    PipelineError,
    Request,
    Response,
    failure::Failure,
};
use gateway_bridge_testing::{drive, drive_body};
use rstest::rstest;

#[derive(Debug)]
struct ViewError;

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("view failed") }
}

impl std::error::Error for ViewError {}

struct Broken;

#[async_trait]
impl AsyncPipeline for Broken {
    async fn call(&self, _request: &mut Request) -> Result<Response, PipelineError> {
        Err(Box::new(ViewError))
    }
}

fn get(path: &str) -> ConnectionScope { ConnectionScope::http("GET", path) }

#[rstest]
#[case(false, "Internal Server Error")]
#[case(true, "Traceback:\nview failed")]
#[tokio::test]
async fn unhandled_failures_fall_back_to_500(#[case] debug: bool, #[case] expected: &str) {
    let handler = GatewayHandler::new(
        BridgeConfig::default().debug(debug),
        Pipeline::asynchronous(Broken),
    );
    let run = drive_body(&handler, get("/"), b"", 1).await;

    assert!(run.result.is_ok());
    let response = run.response().expect("response sent");
    assert_eq!(response.status, 500);
    assert_eq!(response.body(), expected.as_bytes());
    assert_eq!(
        response.header("content-type"),
        Some(&b"text/plain; charset=utf-8"[..])
    );
}

#[tokio::test]
async fn sync_panics_fall_back_to_500() {
    let handler = GatewayHandler::new(
        BridgeConfig::default(),
        Pipeline::sync_fn(|_| panic!("template missing")),
    );
    let run = drive_body(&handler, get("/"), b"", 1).await;
    assert_eq!(run.response().map(|r| r.status), Some(500));
}

#[tokio::test]
async fn error_handler_response_is_sent() {
    let bridge = DispatchBridge::new(Pipeline::asynchronous(Broken)).error_handler(
        |request: &Request, failure: &Failure| -> Result<Response, PipelineError> {
            Ok(Response::text(
                503,
                format!("{} unavailable: {failure}", request.path()),
            ))
        },
    );
    let handler = GatewayHandler::with_bridge(BridgeConfig::default(), bridge);
    let run = drive_body(&handler, get("/reports"), b"", 1).await;

    let response = run.response().expect("response sent");
    assert_eq!(response.status, 503);
    assert_eq!(response.body(), b"/reports unavailable: view failed");
}

#[tokio::test]
async fn failing_error_handler_falls_back_to_500() {
    let bridge = DispatchBridge::new(Pipeline::asynchronous(Broken)).error_handler(
        |_: &Request, _: &Failure| -> Result<Response, PipelineError> {
            Err(Box::new(io::Error::other("handler broke too")))
        },
    );
    let handler = GatewayHandler::with_bridge(BridgeConfig::default(), bridge);
    let run = drive_body(&handler, get("/"), b"", 1).await;

    let response = run.response().expect("response sent");
    assert_eq!(response.status, 500);
    assert_eq!(response.body(), b"Internal Server Error");
}

#[tokio::test]
async fn undecodable_query_gets_400() {
    let handler = GatewayHandler::new(
        BridgeConfig::default(),
        Pipeline::sync_fn(|_| Ok(Response::new(200))),
    );
    let scope = get("/search").raw_query_string(&b"term=\xc3\x28"[..]);
    let run = drive_body(&handler, scope, b"", 1).await;

    let response = run.response().expect("response sent");
    assert_eq!(response.status, 400);
    assert_eq!(response.body(), b"400 Bad Request");
}

#[tokio::test]
async fn non_http_scopes_are_refused() {
    let handler = GatewayHandler::new(
        BridgeConfig::default(),
        Pipeline::sync_fn(|_| Ok(Response::new(200))),
    );
    let scope = ConnectionScope {
        kind: "lifespan".to_owned(),
        ..ConnectionScope::default()
    };
    let run = drive(&handler, scope, []).await;

    assert!(matches!(run.result, Err(HandlerError::UnsupportedScope(_))));
    assert!(run.sent().is_empty());
    assert_eq!(run.transport.receives(), 0);
}

#[tokio::test]
async fn lifecycle_hooks_wrap_each_served_request() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (started, finished) = (Arc::clone(&events), Arc::clone(&events));
    let hooks = LifecycleHooks::default()
        .request_started(move |scope| {
            started
                .lock()
                .expect("lock")
                .push(format!("started {}", scope.path));
        })
        .request_finished(move || finished.lock().expect("lock").push("finished".to_owned()));
    let handler = GatewayHandler::new(
        BridgeConfig::default(),
        Pipeline::sync_fn(|_| Ok(Response::new(204))),
    )
    .hooks(hooks);

    drive_body(&handler, get("/a"), b"", 1).await.result.expect("served");
    drive_body(&handler, get("/b"), b"", 1).await.result.expect("served");
    assert_eq!(
        *events.lock().expect("lock"),
        vec!["started /a", "finished", "started /b", "finished"]
    );
}
