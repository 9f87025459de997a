//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID generation/propagation)
//!     → pipeline (routing, filters, upstream forward)
//!     → response returned to client
//! ```

pub mod request;
pub mod server;

pub use request::{MakeGatewayRequestId, X_REQUEST_ID};
pub use server::HttpServer;
