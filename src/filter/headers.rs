//! Header-append filters.
//!
//! Both filters append rather than insert, so repeated additions and values
//! already present on the request survive.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::exchange::Exchange;
use crate::filter::{FilterConfigError, GatewayFilter};

#[derive(Debug, Error)]
#[error("invalid header {name:?}")]
pub struct InvalidHeader {
    pub name: String,
}

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), InvalidHeader> {
    let header_name: HeaderName = name.parse().map_err(|_| InvalidHeader {
        name: name.to_owned(),
    })?;
    let header_value: HeaderValue = value.parse().map_err(|_| InvalidHeader {
        name: name.to_owned(),
    })?;
    Ok((header_name, header_value))
}

/// Appends a fixed header to every request passing the route.
#[derive(Debug)]
pub struct AddRequestHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddRequestHeader {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidHeader> {
        let (name, value) = parse_pair(name, value)?;
        Ok(Self { name, value })
    }
}

impl GatewayFilter for AddRequestHeader {
    fn on_request(&self, exchange: &mut Exchange) -> crate::filter::FilterOutcome {
        exchange.append_request_header(self.name.clone(), self.value.clone());
        crate::filter::FilterOutcome::Continue
    }
}

/// Appends a fixed header to the upstream response before it is returned.
#[derive(Debug)]
pub struct AddResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddResponseHeader {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidHeader> {
        let (name, value) = parse_pair(name, value)?;
        Ok(Self { name, value })
    }
}

impl GatewayFilter for AddResponseHeader {
    fn on_response(&self, response: &mut Response<Body>) {
        response.headers_mut().append(self.name.clone(), self.value.clone());
    }
}

#[derive(Deserialize)]
struct HeaderPairConfig {
    name: String,
    value: String,
}

fn pair_config(name: &str, config: serde_json::Value) -> Result<HeaderPairConfig, FilterConfigError> {
    serde_json::from_value(config).map_err(|e| FilterConfigError::Invalid {
        name: name.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn request_header_from_config(
    config: serde_json::Value,
) -> Result<Arc<dyn GatewayFilter>, FilterConfigError> {
    let pair = pair_config("add_request_header", config)?;
    let filter = AddRequestHeader::new(&pair.name, &pair.value).map_err(|e| {
        FilterConfigError::Invalid {
            name: "add_request_header".to_owned(),
            reason: e.to_string(),
        }
    })?;
    Ok(Arc::new(filter))
}

pub(crate) fn response_header_from_config(
    config: serde_json::Value,
) -> Result<Arc<dyn GatewayFilter>, FilterConfigError> {
    let pair = pair_config("add_response_header", config)?;
    let filter = AddResponseHeader::new(&pair.name, &pair.value).map_err(|e| {
        FilterConfigError::Invalid {
            name: "add_response_header".to_owned(),
            reason: e.to_string(),
        }
    })?;
    Ok(Arc::new(filter))
}
