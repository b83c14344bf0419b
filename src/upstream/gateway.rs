//! HTTP gateway to the platform REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{Upstream, UpstreamRequest};
use crate::config::UpstreamConfig;
use crate::errors::{AppError, AppResult};

/// Authenticated, rate-limit aware client for the platform API.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: String,
    retry_backoff: Duration,
    max_attempts: u32,
}

impl HttpGateway {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            retry_backoff: config.retry_backoff,
            max_attempts: config.max_attempts.max(1),
        })
    }

    async fn send(&self, request: &UpstreamRequest) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);

        for attempt in 1..=self.max_attempts {
            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .header(AUTHORIZATION, format!("Basic {}", self.token))
                .header(CONTENT_TYPE, "application/json");
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(accept) = &request.accept {
                builder = builder.header(ACCEPT, accept.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    attempt,
                    "Rate limit hit, backing off for {:?}",
                    self.retry_backoff
                );
                if attempt < self.max_attempts {
                    tokio::time::sleep(self.retry_backoff).await;
                }
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }

            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Object(Default::default()));
            }

            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Object(Default::default()));
            }
            return Ok(serde_json::from_str(&text)?);
        }

        Err(AppError::Timeout("API Timeout after retries".to_string()))
    }
}

#[async_trait]
impl Upstream for HttpGateway {
    async fn call(&self, request: UpstreamRequest) -> AppResult<Value> {
        let result = self.send(&request).await;

        if let Err(err) = &result {
            let status = match err {
                AppError::Upstream { status, .. } => Some(*status),
                _ => None,
            };
            tracing::error!(
                method = %request.method,
                path = %request.path,
                status = ?status,
                "Upstream call failed: {}",
                err
            );
        }

        result
    }
}
