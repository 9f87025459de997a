//! Body codec capability.
//!
//! The routing core never assumes a wire format; it asks a codec whether it
//! can handle the request's declared content type and delegates both
//! directions of the byte/value conversion. Only text decoding is needed by
//! the shipped predicates, so the capability is expressed over `String`.

use bytes::Bytes;
use mime::Mime;
use thiserror::Error;

/// Raised when a codec accepted a content type but the payload turned out to
/// be malformed for it. Distinct from "no codec available", which is not an
/// error at all (see [`super::BodyPeekEvaluator`]).
#[derive(Debug, Error)]
#[error("body is not valid {content_type}: {reason}")]
pub struct DecodeError {
    pub content_type: String,
    pub reason: String,
}

/// Two-way converter between body bytes and decoded text, selected by
/// declared content type.
pub trait BodyCodec: Send + Sync + std::fmt::Debug {
    /// Whether this codec can produce text from a body declared as `content_type`.
    /// `None` means the request carried no Content-Type header.
    fn can_decode(&self, content_type: Option<&Mime>) -> bool;

    fn decode(&self, bytes: &[u8], content_type: Option<&Mime>) -> Result<String, DecodeError>;

    /// Whether this codec can serialize text back to a body of `content_type`.
    fn can_encode(&self, content_type: Option<&Mime>) -> bool;

    fn encode(&self, value: &str) -> Bytes;
}

/// Codec for `text/*` bodies (and bodies with no declared type, which HTTP
/// semantics let us treat as plain text). UTF-8 only; a `charset` parameter
/// naming anything else makes the codec decline rather than decode garbage.
#[derive(Debug, Default)]
pub struct PlainTextCodec;

impl PlainTextCodec {
    fn charset_supported(mime: &Mime) -> bool {
        match mime.get_param(mime::CHARSET) {
            None => true,
            Some(cs) => {
                let cs = cs.as_str();
                cs.eq_ignore_ascii_case("utf-8") || cs.eq_ignore_ascii_case("us-ascii")
            }
        }
    }
}

impl BodyCodec for PlainTextCodec {
    fn can_decode(&self, content_type: Option<&Mime>) -> bool {
        match content_type {
            None => true,
            Some(mime) => mime.type_() == mime::TEXT && Self::charset_supported(mime),
        }
    }

    fn decode(&self, bytes: &[u8], content_type: Option<&Mime>) -> Result<String, DecodeError> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| DecodeError {
                content_type: content_type
                    .map(Mime::to_string)
                    .unwrap_or_else(|| mime::TEXT_PLAIN.to_string()),
                reason: e.to_string(),
            })
    }

    fn can_encode(&self, content_type: Option<&Mime>) -> bool {
        self.can_decode(content_type)
    }

    fn encode(&self, value: &str) -> Bytes {
        Bytes::copy_from_slice(value.as_bytes())
    }
}
