//! Route table: ordered storage and first-match lookup.
//!
//! # Design Decisions
//! - Stable sort by `order`, so equal orders keep registration sequence
//! - Scan order is deterministic; a body-peek side effect must land on the
//!   predicate the declaration order says it belongs to
//! - Explicit `None` on no match rather than a silent default route

use std::sync::Arc;

use crate::body::BodyError;
use crate::exchange::Exchange;
use crate::routing::route::Route;

/// Immutable, order-sorted collection of routes. Shared read-only across
/// request tasks; no synchronization needed.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by_key(Route::order);
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// First route, in `order` sequence, whose predicate accepts the
    /// exchange. Predicate failures (a body that contradicts its declared
    /// content type) abort the scan.
    pub async fn lookup(&self, exchange: &mut Exchange) -> Result<Option<Arc<Route>>, BodyError> {
        for route in &self.routes {
            if route.predicate().test(exchange).await? {
                tracing::debug!(route = %route.id(), "Route matched");
                return Ok(Some(route.clone()));
            }
        }
        Ok(None)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
