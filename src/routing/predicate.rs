//! Route predicates.
//!
//! # Responsibilities
//! - Match the Host header against a label glob (`**` = any run of labels,
//!   `*` = exactly one label)
//! - Match the request path, exact or with `{segment}` templates
//! - Delegate body-content decisions to the peek evaluator
//! - Combine predicates with short-circuiting AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port (per HTTP spec)
//! - Path matching is case-sensitive
//! - Evaluation is pure except for the documented body-replay side channel

use std::sync::Arc;

use async_trait::async_trait;

use crate::body::{BodyError, BodyPeekEvaluator};
use crate::exchange::Exchange;

/// Boolean test over an exchange. Body-reading variants may consume the
/// exchange's body slot, which is why evaluation takes `&mut`.
#[async_trait]
pub trait Predicate: Send + Sync + std::fmt::Debug {
    async fn test(&self, exchange: &mut Exchange) -> Result<bool, BodyError>;
}

/// Matches the Host header against a dotted glob pattern.
///
/// Pattern labels: `**` matches zero or more labels, `*` matches exactly
/// one, anything else matches literally (case-insensitive). `**.abc.org`
/// therefore accepts `abc.org`, `www.abc.org`, and `a.b.abc.org`.
#[derive(Debug, Clone)]
pub struct HostPattern {
    labels: Vec<String>,
}

impl HostPattern {
    pub fn new(pattern: impl AsRef<str>) -> Self {
        Self {
            labels: pattern
                .as_ref()
                .to_lowercase()
                .split('.')
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host_labels: Vec<&str> = host.split('.').collect();
        let pattern: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        glob_labels(&pattern, &host_labels)
    }
}

fn glob_labels(pattern: &[&str], host: &[&str]) -> bool {
    match pattern.split_first() {
        None => host.is_empty(),
        Some((&"**", rest)) => (0..=host.len()).any(|skip| glob_labels(rest, &host[skip..])),
        Some((&"*", rest)) => !host.is_empty() && glob_labels(rest, &host[1..]),
        Some((&literal, rest)) => {
            host.first().is_some_and(|label| *label == literal) && glob_labels(rest, &host[1..])
        }
    }
}

#[async_trait]
impl Predicate for HostPattern {
    async fn test(&self, exchange: &mut Exchange) -> Result<bool, BodyError> {
        Ok(exchange.host().is_some_and(|h| self.matches(h)))
    }
}

/// Matches the request path. Template segments written `{name}` accept any
/// single non-empty segment; everything else must match exactly.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone)]
enum PathSegment {
    Literal(String),
    Template,
}

impl PathPattern {
    pub fn new(pattern: impl AsRef<str>) -> Self {
        Self {
            segments: split_path(pattern.as_ref())
                .map(|s| {
                    if s.starts_with('{') && s.ends_with('}') {
                        PathSegment::Template
                    } else {
                        PathSegment::Literal(s.to_owned())
                    }
                })
                .collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = split_path(path).collect();
        segments.len() == self.segments.len()
            && self.segments.iter().zip(&segments).all(|(pat, seg)| match pat {
                PathSegment::Literal(lit) => lit == seg,
                PathSegment::Template => !seg.is_empty(),
            })
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.trim_start_matches('/').split('/').filter(|s| !s.is_empty())
}

#[async_trait]
impl Predicate for PathPattern {
    async fn test(&self, exchange: &mut Exchange) -> Result<bool, BodyError> {
        Ok(self.matches(exchange.path()))
    }
}

/// Consumes the request body through the peek evaluator and applies a
/// caller-supplied test to the decoded text. The body is replayed for
/// downstream stages via the exchange attribute store.
pub struct ReadBody {
    evaluator: Arc<BodyPeekEvaluator>,
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ReadBody {
    pub fn new(
        evaluator: Arc<BodyPeekEvaluator>,
        test: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            evaluator,
            test: Arc::new(test),
        }
    }
}

#[async_trait]
impl Predicate for ReadBody {
    async fn test(&self, exchange: &mut Exchange) -> Result<bool, BodyError> {
        self.evaluator.evaluate(exchange, self.test.as_ref()).await
    }
}

impl std::fmt::Debug for ReadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadBody")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

/// Short-circuiting conjunction; the left side is always evaluated first so
/// that a body-reading right side only runs when the cheap checks pass.
#[derive(Debug)]
pub struct And {
    left: Box<dyn Predicate>,
    right: Box<dyn Predicate>,
}

impl And {
    pub fn new(left: Box<dyn Predicate>, right: Box<dyn Predicate>) -> Self {
        Self { left, right }
    }
}

#[async_trait]
impl Predicate for And {
    async fn test(&self, exchange: &mut Exchange) -> Result<bool, BodyError> {
        if !self.left.test(exchange).await? {
            return Ok(false);
        }
        self.right.test(exchange).await
    }
}
