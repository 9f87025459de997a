//! Gateway error kinds.
//!
//! Every failure is per-request; nothing here is fatal to the process, and
//! an aborted pipeline never leaves shared state (route table, token
//! buckets) inconsistent.

use axum::body::Body;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::body::BodyError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route predicate accepted the request.
    #[error("no matching route")]
    NoMatchingRoute,

    /// A throttle filter denied the request before upstream contact.
    #[error("rate limit exceeded")]
    RateLimited,

    /// A body-peek predicate failed hard: the body could not be read, or it
    /// contradicted its declared content type.
    #[error(transparent)]
    Body(#[from] BodyError),

    /// The forwarded call to the route's target failed.
    #[error("upstream request to {uri} failed: {source}")]
    Upstream {
        uri: Uri,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoMatchingRoute => StatusCode::NOT_FOUND,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Body(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            GatewayError::NoMatchingRoute => "No matching route found",
            GatewayError::RateLimited => "Rate limit exceeded",
            GatewayError::Body(_) => "Request body does not match its declared content type",
            GatewayError::Upstream { .. } => "Upstream request failed",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Body::from(self.client_message())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::DecodeError;

    #[test]
    fn statuses_map_to_error_classes() {
        assert_eq!(GatewayError::NoMatchingRoute.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        let decode = GatewayError::Body(BodyError::Decode(DecodeError {
            content_type: "text/plain".into(),
            reason: "invalid utf-8".into(),
        }));
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);
    }
}
