//! Gateway binary.
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                    GATEWAY                      │
//!                    │                                                 │
//!   Client Request   │  ┌────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ─────────────────┼─▶│  http  │──▶│ routing  │──▶│   filter    │   │
//!                    │  │ server │   │  table   │   │   chain     │   │
//!                    │  └────────┘   └────┬─────┘   └──────┬──────┘   │
//!                    │                    │                │          │
//!                    │              ┌─────▼─────┐   ┌──────▼──────┐   │
//!                    │              │ body peek │   │  upstream   │◀──┼── Backend
//!                    │              │ evaluator │   │   client    │   │
//!                    │              └───────────┘   └─────────────┘   │
//!                    └────────────────────────────────────────────────┘
//! ```
//!
//! Boot order: logging → config → metrics → route table → serve.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use peekway::body::{BodyPeekEvaluator, PlainTextCodec};
use peekway::config::{load_config, GatewayConfig};
use peekway::observability::{logging, metrics};
use peekway::routing::{RouteTable, Routes};
use peekway::{GatewayPipeline, HttpServer};

/// Demo route table: header rewrites, a body-peek route, and a throttled
/// route, all pointing at httpbin.
fn demo_routes(config: &GatewayConfig) -> Result<RouteTable, peekway::routing::RouteBuildError> {
    let evaluator = Arc::new(BodyPeekEvaluator::new(
        vec![Arc::new(PlainTextCodec)],
        config.body.max_peek_bytes,
    ));
    Routes::builder()
        .with_evaluator(evaluator)
        .route(|r| {
            r.host("**.abc.org")
                .path("/image/png")
                .add_response_header("X-TestHeader", "foobar")
                .uri("http://httpbin.org:80")
        })
        .route(|r| {
            r.id("read_body_pred")
                .host("*.readbody.org")
                .read_body(|body| body.trim().eq_ignore_ascii_case("hello"))
                .add_request_header("X-TestHeader", "read_body_pred")
                .uri("http://httpbin.org:80")
        })
        .route(|r| {
            r.id("rewrite_request")
                .host("*.rewriterequest.org")
                .add_request_header("X-TestHeader", "rewrite_request")
                .uri("http://httpbin.org:80")
        })
        .route(|r| {
            r.id("rewrite_response")
                .host("*.rewriteresponse.org")
                .add_request_header("X-TestHeader", "rewrite_response")
                .uri("http://httpbin.org:80")
        })
        .route(|r| {
            r.path("/image/webp")
                .add_response_header("X-AnotherHeader", "baz")
                .uri("http://httpbin.org:80")
        })
        .route(|r| {
            r.order(-1)
                .host("**.throttle.org")
                .path("/get")
                .throttle(1, 1, Duration::from_secs(10))
                .uri("http://httpbin.org:80")
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file as the first argument; defaults otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_filter);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let table = demo_routes(&config)?;
    tracing::info!(routes = table.routes().len(), "Route table assembled");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let pipeline = GatewayPipeline::new(table);
    let server = HttpServer::new(config, pipeline);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
