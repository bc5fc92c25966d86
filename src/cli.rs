//! Command line interface for the `gateway-bridge` demo binary.
//!
//! Describes one request to push through the adapter and the limits to
//! apply while serving it.

use std::num::NonZeroUsize;

use clap::Parser;
use gateway_bridge::BridgeConfig;

/// Command line arguments for the `gateway-bridge` binary.
#[derive(Debug, Parser)]
#[command(
    name = "gateway-bridge",
    version,
    about = "Serve one scripted request through the gateway adapter"
)]
pub struct Cli {
    /// HTTP method of the request.
    #[arg(short, long, default_value = "GET")]
    pub method: String,
    /// Request path, including any root path.
    #[arg(short, long, default_value = "/")]
    pub path: String,
    /// Mount point of the application.
    #[arg(long)]
    pub root_path: Option<String>,
    /// Query string without the leading `?`.
    #[arg(short, long, default_value = "")]
    pub query: String,
    /// Request header as `name: value`; may be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
    /// Request body.
    #[arg(short, long, default_value = "")]
    pub body: String,
    /// Size of the body events delivered to the adapter.
    #[arg(long, default_value = "8")]
    pub body_chunk_size: NonZeroUsize,
    /// Size of the response body messages.
    #[arg(long)]
    pub chunk_size: Option<NonZeroUsize>,
    /// In-memory ceiling for request bodies; defaults to 2.5 MiB.
    #[arg(long)]
    pub max_body_size: Option<NonZeroUsize>,
    /// Accept request bodies of any size.
    #[arg(long, conflicts_with = "max_body_size")]
    pub no_body_limit: bool,
    /// Serve through the asynchronous echo pipeline.
    #[arg(long = "async")]
    pub asynchronous: bool,
    /// Include failure traces in 500 responses.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Adapter configuration selected by the flags.
    pub fn config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::default().debug(self.debug);
        if self.no_body_limit {
            config = config.max_body_size(None);
        } else if let Some(limit) = self.max_body_size {
            config = config.max_body_size(Some(limit));
        }
        if let Some(size) = self.chunk_size {
            config = config.chunk_size(size);
        }
        config
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name is empty".to_owned());
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}
