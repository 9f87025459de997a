//! Request ID generation.
//!
//! # Design Decisions
//! - UUID v4 request IDs, attached as early as possible so every log line
//!   and upstream hop can be correlated
//! - IDs already present on the incoming request are kept, not replaced

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// `MakeRequestId` implementation producing UUID v4 values, plugged into
/// tower-http's set/propagate request-id layers.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeGatewayRequestId;

impl MakeRequestId for MakeGatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn generates_parseable_uuids() {
        let mut maker = MakeGatewayRequestId;
        let request = Request::builder().body(Body::empty()).unwrap();
        let id = maker.make_request_id(&request).unwrap();
        let raw = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(raw).is_ok());
    }
}
