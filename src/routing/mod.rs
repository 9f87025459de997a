//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers, maybe body)
//!     → table.rs (ordered route scan)
//!     → predicate.rs (host glob / path template / body peek, AND-composed)
//!     → Return: matched Route or no match
//!
//! Route Assembly (at startup):
//!     builder DSL (route.rs)
//!     → Sort by order (stable, registration order breaks ties)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes assembled once, immutable at runtime
//! - Deterministic first-match-wins scan; essential because a body-peek
//!   predicate consumes the request body as a side effect
//! - At most one body-reading predicate per request is the caller's
//!   responsibility; this module does not guard against a second reader

pub mod predicate;
pub mod route;
pub mod table;

pub use predicate::{And, HostPattern, PathPattern, Predicate, ReadBody};
pub use route::{Route, RouteBuildError, Routes};
pub use table::RouteTable;
