//! Route definition and assembly DSL.
//!
//! # Responsibilities
//! - Bind a composed predicate, an ordered filter chain, and a target URI
//! - Offer a fluent builder mirroring how gateways declare routes in code
//! - Fold multiple predicate declarations into a left-to-right AND chain
//!
//! # Design Decisions
//! - Routes are immutable once built; the table shares them via `Arc`
//! - `order` defaults to the registration index, so unordered declarations
//!   keep their written sequence
//! - Anonymous routes get generated `route-N` ids for logs and metrics

use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use thiserror::Error;

use crate::body::BodyPeekEvaluator;
use crate::filter::{
    build_filter, AddRequestHeader, AddResponseHeader, FilterConfigError, GatewayFilter, Throttle,
};
use crate::routing::predicate::{And, HostPattern, PathPattern, Predicate, ReadBody};
use crate::routing::table::RouteTable;

/// One routing rule: predicate in, filter chain and upstream target out.
#[derive(Debug)]
pub struct Route {
    id: String,
    order: i32,
    predicate: Box<dyn Predicate>,
    filters: Vec<Arc<dyn GatewayFilter>>,
    target: Uri,
}

impl Route {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn predicate(&self) -> &dyn Predicate {
        self.predicate.as_ref()
    }

    pub fn filters(&self) -> &[Arc<dyn GatewayFilter>] {
        &self.filters
    }

    pub fn target(&self) -> &Uri {
        &self.target
    }
}

#[derive(Debug, Error)]
pub enum RouteBuildError {
    #[error("route {route:?} declares no predicate")]
    MissingPredicate { route: String },

    #[error("route {route:?} declares no target uri")]
    MissingTarget { route: String },

    #[error("route {route:?} target {uri:?} is not a valid uri")]
    InvalidTarget { route: String, uri: String },

    #[error("route {route:?} target {uri:?} has no host")]
    TargetWithoutHost { route: String, uri: String },

    #[error("route {route:?}: invalid header {name:?}")]
    InvalidHeader { route: String, name: String },

    #[error("route {route:?}: {source}")]
    Filter {
        route: String,
        #[source]
        source: FilterConfigError,
    },
}

/// Entry point of the assembly DSL.
///
/// ```no_run
/// use std::time::Duration;
/// use peekway::routing::Routes;
///
/// let table = Routes::builder()
///     .route(|r| {
///         r.host("**.abc.org")
///             .path("/image/png")
///             .add_response_header("X-TestHeader", "foobar")
///             .uri("http://httpbin.org:80")
///     })
///     .route(|r| {
///         r.order(-1)
///             .host("**.throttle.org")
///             .path("/get")
///             .throttle(1, 1, Duration::from_secs(10))
///             .uri("http://httpbin.org:80")
///     })
///     .build()
///     .unwrap();
/// # let _ = table;
/// ```
pub struct Routes;

impl Routes {
    pub fn builder() -> RoutesBuilder {
        RoutesBuilder {
            evaluator: Arc::new(BodyPeekEvaluator::default()),
            routes: Vec::new(),
        }
    }
}

pub struct RoutesBuilder {
    evaluator: Arc<BodyPeekEvaluator>,
    routes: Vec<RouteBuilder>,
}

impl RoutesBuilder {
    /// Replace the body-peek evaluator shared by `read_body` predicates,
    /// e.g. to install additional codecs.
    pub fn with_evaluator(mut self, evaluator: Arc<BodyPeekEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn route<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(RouteBuilder) -> RouteBuilder,
    {
        let builder = RouteBuilder::new(self.routes.len(), self.evaluator.clone());
        self.routes.push(configure(builder));
        self
    }

    pub fn build(self) -> Result<RouteTable, RouteBuildError> {
        let routes = self
            .routes
            .into_iter()
            .map(RouteBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteTable::new(routes))
    }
}

enum PendingFilter {
    RequestHeader(String, String),
    ResponseHeader(String, String),
    Named(String, serde_json::Value),
    Built(Arc<dyn GatewayFilter>),
}

pub struct RouteBuilder {
    index: usize,
    id: Option<String>,
    order: Option<i32>,
    evaluator: Arc<BodyPeekEvaluator>,
    predicates: Vec<Box<dyn Predicate>>,
    filters: Vec<PendingFilter>,
    target: Option<String>,
}

impl RouteBuilder {
    fn new(index: usize, evaluator: Arc<BodyPeekEvaluator>) -> Self {
        Self {
            index,
            id: None,
            order: None,
            evaluator,
            predicates: Vec::new(),
            filters: Vec::new(),
            target: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Explicit evaluation order; lower values are tried first. Defaults to
    /// the registration index.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// AND in a Host-header glob predicate.
    pub fn host(mut self, pattern: impl AsRef<str>) -> Self {
        self.predicates.push(Box::new(HostPattern::new(pattern)));
        self
    }

    /// AND in an exact-or-templated path predicate.
    pub fn path(mut self, pattern: impl AsRef<str>) -> Self {
        self.predicates.push(Box::new(PathPattern::new(pattern)));
        self
    }

    /// AND in a body-content predicate. The body is consumed through the
    /// table's peek evaluator and replayed for forwarding; at most one such
    /// predicate may run per request.
    pub fn read_body(mut self, test: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.predicates
            .push(Box::new(ReadBody::new(self.evaluator.clone(), test)));
        self
    }

    /// AND in an arbitrary predicate.
    pub fn predicate(mut self, predicate: Box<dyn Predicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn add_request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .push(PendingFilter::RequestHeader(name.into(), value.into()));
        self
    }

    pub fn add_response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .push(PendingFilter::ResponseHeader(name.into(), value.into()));
        self
    }

    pub fn throttle(mut self, capacity: u64, refill_tokens: u64, refill_period: Duration) -> Self {
        self.filters.push(PendingFilter::Built(Arc::new(Throttle::new(
            capacity,
            refill_tokens,
            refill_period,
        ))));
        self
    }

    /// Append a pre-built filter.
    pub fn filter(mut self, filter: Arc<dyn GatewayFilter>) -> Self {
        self.filters.push(PendingFilter::Built(filter));
        self
    }

    /// Append a filter resolved through the registry at build time.
    pub fn filter_named(mut self, name: impl Into<String>, config: serde_json::Value) -> Self {
        self.filters.push(PendingFilter::Named(name.into(), config));
        self
    }

    pub fn uri(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    fn build(self) -> Result<Route, RouteBuildError> {
        let id = self.id.unwrap_or_else(|| format!("route-{}", self.index));

        let mut predicates = self.predicates.into_iter();
        let first = predicates
            .next()
            .ok_or_else(|| RouteBuildError::MissingPredicate { route: id.clone() })?;
        let predicate = predicates.fold(first, |acc, next| -> Box<dyn Predicate> {
            Box::new(And::new(acc, next))
        });

        let raw_target = self
            .target
            .ok_or_else(|| RouteBuildError::MissingTarget { route: id.clone() })?;
        let target: Uri = raw_target.parse().map_err(|_| RouteBuildError::InvalidTarget {
            route: id.clone(),
            uri: raw_target.clone(),
        })?;
        if target.authority().is_none() {
            return Err(RouteBuildError::TargetWithoutHost {
                route: id,
                uri: raw_target,
            });
        }

        let filters = self
            .filters
            .into_iter()
            .map(|pending| resolve_filter(&id, pending))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Route {
            id,
            order: self.order.unwrap_or(self.index as i32),
            predicate,
            filters,
            target,
        })
    }
}

fn resolve_filter(
    route: &str,
    pending: PendingFilter,
) -> Result<Arc<dyn GatewayFilter>, RouteBuildError> {
    match pending {
        PendingFilter::RequestHeader(name, value) => AddRequestHeader::new(&name, &value)
            .map(|f| Arc::new(f) as Arc<dyn GatewayFilter>)
            .map_err(|_| RouteBuildError::InvalidHeader {
                route: route.to_owned(),
                name,
            }),
        PendingFilter::ResponseHeader(name, value) => AddResponseHeader::new(&name, &value)
            .map(|f| Arc::new(f) as Arc<dyn GatewayFilter>)
            .map_err(|_| RouteBuildError::InvalidHeader {
                route: route.to_owned(),
                name,
            }),
        PendingFilter::Named(name, config) => {
            build_filter(&name, config).map_err(|source| RouteBuildError::Filter {
                route: route.to_owned(),
                source,
            })
        }
        PendingFilter::Built(filter) => Ok(filter),
    }
}
