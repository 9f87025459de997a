//! Body-peek evaluation: read once, decide, replay.
//!
//! # Responsibilities
//! - Buffer the single-consumption request body for one routing predicate
//! - Decode it to text via a negotiated codec, apply the caller's test
//! - Re-encode and divert the bytes into the exchange's `cachedRequestBody`
//!   attribute so downstream forwarding sees an intact body
//!
//! # Design Decisions
//! - The buffering await is the only suspension point; routing for this
//!   request waits on it, other in-flight requests do not
//! - No codec for the declared content type → `Ok(false)`, never an error
//! - A decode failure is surfaced; it means the payload contradicts its
//!   declared content type

use std::sync::Arc;

use thiserror::Error;

use crate::body::codec::{BodyCodec, DecodeError, PlainTextCodec};
use crate::exchange::{Exchange, CACHED_REQUEST_BODY};

/// Ways the peek can fail hard. "No suitable codec" is deliberately absent:
/// that case is reported as a non-match, not a failure.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(axum::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Buffers, decodes, tests, and replays a request body on behalf of a
/// body-content routing predicate. One instance is shared by every route in
/// a table; it holds no per-request state.
pub struct BodyPeekEvaluator {
    codecs: Vec<Arc<dyn BodyCodec>>,
    max_bytes: usize,
}

impl BodyPeekEvaluator {
    pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

    pub fn new(codecs: Vec<Arc<dyn BodyCodec>>, max_bytes: usize) -> Self {
        Self { codecs, max_bytes }
    }

    /// Evaluate `test` against the decoded request body.
    ///
    /// On return the exchange's body slot is empty and, when a matching
    /// encoder existed, the re-encoded bytes sit under `cachedRequestBody`
    /// for the forwarding stage to replay.
    pub async fn evaluate(
        &self,
        exchange: &mut Exchange,
        test: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> Result<bool, BodyError> {
        let content_type = exchange.content_type();

        let Some(decoder) = self
            .codecs
            .iter()
            .find(|c| c.can_decode(content_type.as_ref()))
        else {
            return Ok(false);
        };

        // Single suspension point: the whole body must arrive before the
        // routing decision can be made.
        let body = exchange.take_body().unwrap_or_else(axum::body::Body::empty);
        let bytes = axum::body::to_bytes(body, self.max_bytes)
            .await
            .map_err(BodyError::Read)?;

        let decoded = decoder.decode(&bytes, content_type.as_ref())?;

        // Divert the re-encoded bytes into the attribute store instead of
        // writing them anywhere; forwarding picks them up from there.
        if let Some(encoder) = self
            .codecs
            .iter()
            .find(|c| c.can_encode(content_type.as_ref()))
        {
            exchange.insert_attribute(CACHED_REQUEST_BODY, encoder.encode(&decoded));
        }

        Ok(test(&decoded))
    }
}

impl Default for BodyPeekEvaluator {
    fn default() -> Self {
        Self::new(vec![Arc::new(PlainTextCodec)], Self::DEFAULT_MAX_BYTES)
    }
}

impl std::fmt::Debug for BodyPeekEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyPeekEvaluator")
            .field("codecs", &self.codecs.len())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
