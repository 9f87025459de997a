//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! Matched Route
//!     → request phase: each filter in declared order
//!       (mutate exchange, or reject and halt before upstream contact)
//!     → upstream call
//!     → response phase: each filter in declared order
//!       (mutate the upstream response before it reaches the client)
//! ```
//!
//! # Design Decisions
//! - Filters are built once at assembly time and shared across requests
//! - The throttle's token bucket is the only mutable shared state; every
//!   other filter is stateless
//! - A registry keyed by filter name lets external code plug in variants
//!   without touching the dispatch path

pub mod headers;
pub mod throttle;
pub mod token_bucket;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use axum::body::Body;
use axum::http::Response;
use thiserror::Error;

use crate::exchange::Exchange;
use crate::pipeline::GatewayError;

pub use headers::{AddRequestHeader, AddResponseHeader};
pub use throttle::Throttle;
pub use token_bucket::TokenBucket;

/// Result of a filter's request phase.
pub enum FilterOutcome {
    /// Keep going down the chain.
    Continue,
    /// Halt the chain; the request never reaches upstream.
    Reject(GatewayError),
}

/// A request/response mutation step. Both phases default to pass-through so
/// single-phase filters implement only the side they care about.
pub trait GatewayFilter: Send + Sync + std::fmt::Debug {
    fn on_request(&self, _exchange: &mut Exchange) -> FilterOutcome {
        FilterOutcome::Continue
    }

    fn on_response(&self, _response: &mut Response<Body>) {}
}

/// Constructor signature for registry-built filters.
pub type FilterConstructor = fn(serde_json::Value) -> Result<Arc<dyn GatewayFilter>, FilterConfigError>;

#[derive(Debug, Error)]
pub enum FilterConfigError {
    #[error("unknown filter {0:?}")]
    Unknown(String),

    #[error("invalid config for filter {name:?}: {reason}")]
    Invalid { name: String, reason: String },
}

static FILTER_REGISTRY: LazyLock<RwLock<HashMap<String, FilterConstructor>>> = LazyLock::new(|| {
    let mut registry: HashMap<String, FilterConstructor> = HashMap::new();
    registry.insert("add_request_header".into(), headers::request_header_from_config);
    registry.insert("add_response_header".into(), headers::response_header_from_config);
    registry.insert("throttle".into(), throttle::from_config);
    RwLock::new(registry)
});

/// Register a filter constructor under a unique name. Later registrations
/// shadow earlier ones, built-ins included.
pub fn register_filter(name: impl Into<String>, constructor: FilterConstructor) {
    FILTER_REGISTRY
        .write()
        .expect("filter registry lock poisoned")
        .insert(name.into(), constructor);
}

/// Build a filter by registry name from a JSON config value.
pub fn build_filter(
    name: &str,
    config: serde_json::Value,
) -> Result<Arc<dyn GatewayFilter>, FilterConfigError> {
    let constructor = {
        let registry = FILTER_REGISTRY
            .read()
            .expect("filter registry lock poisoned");
        registry
            .get(name)
            .copied()
            .ok_or_else(|| FilterConfigError::Unknown(name.to_owned()))?
    };
    constructor(config)
}
