//! Gateway pipeline: match → filter → forward → respond.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RouteTable lookup (predicates; may suspend to peek the body)
//!     → request-phase filters, declared order (throttle may reject here)
//!     → upstream call to route.target (replayed body if one was peeked)
//!     → response-phase filters, declared order
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The per-request ordering above is strict; across requests nothing is
//!   ordered, tasks are independent
//! - A rejected or failed request stops before upstream contact and reports
//!   a typed error; the caller maps it to a status
//! - No retries here; retry policy belongs to an outer layer

pub mod error;

pub use error::GatewayError;

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::exchange::Exchange;
use crate::filter::FilterOutcome;
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Orchestrates one request end to end. Cheap to share; holds only the
/// immutable route table and a pooled upstream client.
pub struct GatewayPipeline {
    table: RouteTable,
    client: Client<HttpConnector, Body>,
}

impl std::fmt::Debug for GatewayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayPipeline")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl GatewayPipeline {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let start = Instant::now();
        let mut exchange = Exchange::new(request);
        let method = exchange.method().to_string();

        let route = match self.table.lookup(&mut exchange).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                metrics::record_request(&method, 404, "none", start);
                return Err(GatewayError::NoMatchingRoute);
            }
            Err(source) => {
                let err = GatewayError::from(source);
                metrics::record_request(&method, err.status().as_u16(), "none", start);
                return Err(err);
            }
        };

        for filter in route.filters() {
            if let FilterOutcome::Reject(err) = filter.on_request(&mut exchange) {
                metrics::record_request(&method, err.status().as_u16(), route.id(), start);
                return Err(err);
            }
        }

        let upstream_request = exchange.into_upstream_request(route.target());
        let uri = upstream_request.uri().clone();

        tracing::debug!(
            route = %route.id(),
            target = %uri,
            "Forwarding request upstream"
        );

        let response = match self.client.request(upstream_request).await {
            Ok(response) => response,
            Err(source) => {
                tracing::error!(route = %route.id(), target = %uri, error = %source, "Upstream error");
                metrics::record_request(&method, 502, route.id(), start);
                return Err(GatewayError::Upstream { uri, source });
            }
        };

        let mut response = response.map(Body::new);
        for filter in route.filters() {
            filter.on_response(&mut response);
        }

        metrics::record_request(&method, response.status().as_u16(), route.id(), start);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::Request;
    use metrics::{
        Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };

    use super::GatewayPipeline;
    use crate::routing::Routes;

    #[derive(Clone, Default)]
    struct RecordedCounters(Arc<Mutex<Vec<String>>>);

    struct TestRecorder(RecordedCounters);

    struct TestCounter(String, RecordedCounters);

    impl CounterFn for TestCounter {
        fn increment(&self, _value: u64) {
            self.1 .0.lock().unwrap().push(self.0.clone());
        }

        fn absolute(&self, _value: u64) {}
    }

    impl Recorder for TestRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let labels = key
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect::<Vec<_>>()
                .join(",");
            Counter::from_arc(Arc::new(TestCounter(
                format!("{} {labels}", key.name()),
                self.0.clone(),
            )))
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    // Runs on a current-thread runtime so the thread-local recorder stays
    // installed across the body read inside handle().
    #[tokio::test]
    async fn undecodable_body_rejection_is_counted() {
        let table = Routes::builder()
            .route(|route| {
                route
                    .host("*.readbody.org")
                    .read_body(|body| body.trim().eq_ignore_ascii_case("hello"))
                    .uri("http://127.0.0.1:80")
            })
            .build()
            .unwrap();
        let pipeline = GatewayPipeline::new(table);

        let counters = RecordedCounters::default();
        let recorder = TestRecorder(counters.clone());
        let guard = metrics::set_default_local_recorder(&recorder);

        let request = Request::builder()
            .uri("/post")
            .header("Host", "www.readbody.org")
            .header("Content-Type", "text/plain")
            .body(Body::from(vec![0xff, 0xfe, 0xfd]))
            .unwrap();
        let err = pipeline.handle(request).await.unwrap_err();
        drop(guard);

        assert_eq!(err.status().as_u16(), 400);
        let recorded = counters.0.lock().unwrap();
        assert!(
            recorded.iter().any(|entry| {
                entry.starts_with("gateway_requests_total")
                    && entry.contains("status=400")
                    && entry.contains("route=none")
            }),
            "recorded counters: {recorded:?}"
        );
    }
}
