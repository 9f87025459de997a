//! Request body inspection subsystem.
//!
//! # Data Flow
//! ```text
//! Routing predicate needs body content
//!     → peek.rs (buffer the single-pass body)
//!     → codec.rs (content-type negotiation, decode to text)
//!     → predicate function decides match
//!     → codec.rs (re-encode)
//!     → exchange attribute store (cachedRequestBody, replayed downstream)
//! ```
//!
//! # Design Decisions
//! - Codec selection by declared content type; no sniffing
//! - "No codec" is a non-match, "codec failed" is a hard error
//! - The decoded value is all-or-nothing; a partial read never reaches predicates

pub mod codec;
pub mod peek;

pub use codec::{BodyCodec, DecodeError, PlainTextCodec};
pub use peek::{BodyError, BodyPeekEvaluator};
