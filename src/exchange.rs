//! Per-request exchange state.
//!
//! # Responsibilities
//! - Carry request metadata (headers, host, path) through routing and filtering
//! - Hold the single-consumption request body slot
//! - Provide a string-keyed attribute store for side-channel data
//!   (notably the replayed body cached by the body-peek evaluator)
//! - Assemble the outbound upstream request once routing and filters are done
//!
//! # Design Decisions
//! - The body can be taken exactly once; a second take observes an empty slot
//! - Cached body bytes take precedence over the live body when forwarding
//! - Header mutation appends rather than replaces (multi-value headers survive)

use std::collections::HashMap;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::uri::{PathAndQuery, Scheme};
use axum::http::{HeaderName, HeaderValue, Request, Uri};
use bytes::Bytes;
use mime::Mime;

/// Attribute key under which the body-peek evaluator caches the re-encoded
/// request body for downstream replay.
pub const CACHED_REQUEST_BODY: &str = "cachedRequestBody";

/// Mutable per-request state threaded through predicate evaluation and the
/// filter chain. Constructed from an incoming request, consumed when the
/// upstream request is built.
pub struct Exchange {
    parts: Parts,
    body: Option<Body>,
    attributes: HashMap<String, Bytes>,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            attributes: HashMap::new(),
        }
    }

    /// Host the client addressed, from the Host header (HTTP/1.1) or the
    /// URI authority (HTTP/2), without the port.
    pub fn host(&self) -> Option<&str> {
        let raw = self
            .parts
            .headers
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.parts.uri.host())?;
        if raw.starts_with('[') {
            // Bracketed IPv6 literal; only a port after the closing bracket
            // may be stripped, never the colons inside it.
            return Some(match raw.rfind(']') {
                Some(end) => &raw[..=end],
                None => raw,
            });
        }
        Some(raw.rsplit_once(':').map_or(raw, |(host, _port)| host))
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn method(&self) -> &axum::http::Method {
        &self.parts.method
    }

    /// Declared media type of the request body, if any was sent and it parses.
    pub fn content_type(&self) -> Option<Mime> {
        self.parts
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Append a request header; existing values under the same name are kept.
    pub fn append_request_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.parts.headers.append(name, value);
    }

    /// Take the request body out of the exchange. The slot is emptied; callers
    /// that consume the body are expected to publish a replacement through the
    /// attribute store if later stages still need the bytes.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub fn insert_attribute(&mut self, key: impl Into<String>, value: Bytes) {
        self.attributes.insert(key.into(), value);
    }

    pub fn attribute(&self, key: &str) -> Option<&Bytes> {
        self.attributes.get(key)
    }

    /// Build the request to send upstream: the target's scheme and authority
    /// replace the incoming ones, path and query pass through, and the body is
    /// the cached replay if a peek consumed the original.
    pub fn into_upstream_request(mut self, target: &Uri) -> Request<Body> {
        let mut uri_parts = self.parts.uri.clone().into_parts();
        uri_parts.scheme = target.scheme().cloned().or(Some(Scheme::HTTP));
        uri_parts.authority = target.authority().cloned();
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        let uri = Uri::from_parts(uri_parts).unwrap_or_else(|_| self.parts.uri.clone());

        let body = match self.attributes.remove(CACHED_REQUEST_BODY) {
            Some(cached) => Body::from(cached),
            None => self.body.take().unwrap_or_else(Body::empty),
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.parts.method;
        *request.uri_mut() = uri;
        *request.version_mut() = self.parts.version;
        *request.headers_mut() = self.parts.headers;
        request
    }
}
