//! Upstream platform API access.
//!
//! Every outbound call goes through an [`Upstream`] implementation. The production
//! implementation is [`HttpGateway`]; tests substitute an in-memory platform.

mod gateway;
mod pager;

#[cfg(test)]
pub mod fake;

pub use gateway::*;
pub use pager::*;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::AppResult;

/// A single call against the upstream REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the default `Accept` header for versioned endpoints
    pub accept: Option<String>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    /// Look up a query parameter by name.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The single chokepoint for outbound platform calls.
///
/// Returns the parsed JSON body, or an empty object when the response had no content.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(&self, request: UpstreamRequest) -> AppResult<Value>;
}

/// Issue a call and decode the response into `T`.
pub async fn call_as<T: DeserializeOwned>(
    upstream: &dyn Upstream,
    request: UpstreamRequest,
) -> AppResult<T> {
    let value = upstream.call(request).await?;
    Ok(serde_json::from_value(value)?)
}

/// Path of the installation collection for a space.
pub fn installations_path(space_id: &str) -> String {
    format!("/spaces/{}/installations", space_id)
}
