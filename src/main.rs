//! Demo binary driving `gateway_bridge` over an in-process channel.
//!
//! Builds a connection scope from the CLI, delivers the body in chunks,
//! serves it through an echo pipeline and prints every outbound message.

mod cli;

use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use gateway_bridge::{
    AsyncPipeline,
    ConnectionScope,
    GatewayHandler,
    InboundEvent,
    OutboundMessage,
    Pipeline,
    PipelineError,
    Request,
    Response,
    transport::{DEFAULT_CHANNEL_CAPACITY, channel},
};

/// Echoes the request line, query parameters and body.
struct Echo;

#[async_trait]
impl AsyncPipeline for Echo {
    async fn call(&self, request: &mut Request) -> Result<Response, PipelineError> {
        Ok(echo(request))
    }
}

fn echo(request: &Request) -> Response {
    let mut out = format!("{} {}\n", request.method(), request.path());
    for (key, values) in request.query_params().iter() {
        for value in values {
            out.push_str(&format!("query {key}={value}\n"));
        }
    }
    out.push_str(&request.text());
    Response::text(200, out).header("X-Echo-Length", request.body().len().to_string())
}

fn scope(cli: &cli::Cli) -> ConnectionScope {
    let mut scope = ConnectionScope::http(cli.method.clone(), cli.path.clone())
        .query_string(cli.query.clone())
        .client("127.0.0.1", 50_000)
        .server("127.0.0.1", 8000)
        .header("content-length", cli.body.len().to_string());
    if let Some(root_path) = &cli.root_path {
        scope = scope.root_path(root_path.clone());
    }
    for (name, value) in &cli.headers {
        scope = scope.header(name.to_ascii_lowercase(), value.clone());
    }
    scope
}

fn body_events(body: &[u8], size: usize) -> Vec<InboundEvent> {
    if body.is_empty() {
        return vec![InboundEvent::last(Bytes::new())];
    }
    let count = body.len().div_ceil(size);
    body.chunks(size)
        .enumerate()
        .map(|(index, part)| {
            let part = Bytes::copy_from_slice(part);
            if index + 1 == count {
                InboundEvent::last(part)
            } else {
                InboundEvent::chunk(part)
            }
        })
        .collect()
}

fn print_message(message: &OutboundMessage) {
    match message {
        OutboundMessage::ResponseStart { status, headers } => {
            println!("{} status={status}", message.type_name());
            for (name, value) in headers {
                println!(
                    "  {}: {}",
                    String::from_utf8_lossy(name),
                    String::from_utf8_lossy(value)
                );
            }
        }
        OutboundMessage::ResponseBody { body, more_body } => {
            println!(
                "{} more_body={more_body} body={:?}",
                message.type_name(),
                String::from_utf8_lossy(body)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let config = cli.config();
    let pipeline = if cli.asynchronous {
        Pipeline::asynchronous(Echo)
    } else {
        Pipeline::sync_fn(|request| Ok(echo(request)))
    };
    let handler = GatewayHandler::new(config, pipeline);

    let events = body_events(cli.body.as_bytes(), cli.body_chunk_size.get());
    let (mut transport, mut peer) = channel(events.len().max(DEFAULT_CHANNEL_CAPACITY));
    for event in events {
        peer.deliver(event).await?;
    }

    let scope = scope(&cli);
    let served = tokio::spawn(async move { handler.handle(scope, &mut transport).await });
    for message in peer.collect_response().await {
        print_message(&message);
    }
    served.await??;
    Ok(())
}
