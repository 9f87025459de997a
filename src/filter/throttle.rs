//! Token-bucket throttle filter.
//!
//! # Design Decisions
//! - One bucket per filter instance, shared by every request on the route
//! - Refill-then-consume runs as a single critical section under one mutex;
//!   two concurrent requests can never both spend the same token
//! - A denied request halts the chain before any upstream contact

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;

use crate::exchange::Exchange;
use crate::filter::token_bucket::TokenBucket;
use crate::filter::{FilterConfigError, FilterOutcome, GatewayFilter};
use crate::observability::metrics;
use crate::pipeline::GatewayError;

pub struct Throttle {
    bucket: Mutex<TokenBucket>,
}

impl Throttle {
    pub fn new(capacity: u64, refill_tokens: u64, refill_period: Duration) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(capacity, refill_tokens, refill_period)),
        }
    }
}

impl GatewayFilter for Throttle {
    fn on_request(&self, exchange: &mut Exchange) -> FilterOutcome {
        let admitted = self
            .bucket
            .lock()
            .expect("throttle bucket mutex poisoned")
            .try_consume();

        if admitted {
            FilterOutcome::Continue
        } else {
            tracing::warn!(path = %exchange.path(), "Rate limit exceeded");
            metrics::record_rate_limited();
            FilterOutcome::Reject(GatewayError::RateLimited)
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bucket = self.bucket.lock().expect("throttle bucket mutex poisoned");
        f.debug_struct("Throttle")
            .field("capacity", &bucket.capacity())
            .field("tokens", &bucket.tokens())
            .finish()
    }
}

#[derive(Deserialize)]
struct ThrottleConfig {
    capacity: u64,
    refill_tokens: u64,
    refill_period_secs: u64,
}

pub(crate) fn from_config(
    config: serde_json::Value,
) -> Result<Arc<dyn GatewayFilter>, FilterConfigError> {
    let cfg: ThrottleConfig =
        serde_json::from_value(config).map_err(|e| FilterConfigError::Invalid {
            name: "throttle".to_owned(),
            reason: e.to_string(),
        })?;
    Ok(Arc::new(Throttle::new(
        cfg.capacity,
        cfg.refill_tokens,
        Duration::from_secs(cfg.refill_period_secs),
    )))
}
