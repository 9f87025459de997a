//! Peekway: a request-routing and forwarding gateway core.
//!
//! Incoming requests are matched against a prioritized route table (host
//! globs, path templates, body-content peeks), the matched route's filter
//! chain mutates the exchange (header rewrites, token-bucket throttling),
//! and the request is forwarded to that route's upstream. Body-peek
//! predicates buffer the single-pass request body, decide, and replay it so
//! forwarding still sees the full payload.

pub mod body;
pub mod config;
pub mod exchange;
pub mod filter;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod routing;

pub use config::GatewayConfig;
pub use exchange::Exchange;
pub use http::HttpServer;
pub use pipeline::{GatewayError, GatewayPipeline};
pub use routing::{RouteTable, Routes};
