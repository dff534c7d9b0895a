//! HTTP link for queries and mutations.

use cable_config::{ConfigError, GraphqlConfig};
use cable_protocols::{Forward, GraphqlRequest, Link, LinkError, Operation, OperationStream};
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::debug;
use url::Url;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

/// Terminating link that POSTs operations to a GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct HttpLink {
    client: reqwest::Client,
    endpoint: Url,
    headers: Vec<(String, String)>,
}

impl HttpLink {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            headers: Vec::new(),
        }
    }

    /// Link for the configured endpoint, `None` when none is set.
    pub fn from_config(config: &GraphqlConfig) -> Result<Option<Self>, ConfigError> {
        let Some(endpoint) = config.http_endpoint.as_deref() else {
            return Ok(None);
        };
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            field: "graphql.http_endpoint".to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(Self::new(endpoint)))
    }

    /// Add a header to every request (e.g. `Cookie`).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Execute one request and return the response body.
    ///
    /// A body with `errors` but no `data` is an error; partial results come
    /// back as-is.
    pub async fn execute(&self, request: &GraphqlRequest) -> Result<Value, LinkError> {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(request);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LinkError::Http(e.to_string()))?;
        let status = response.status();
        debug!(status = status.as_u16(), "GraphQL HTTP response");

        let text = response
            .text()
            .await
            .map_err(|e| LinkError::Http(e.to_string()))?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(LinkError::Http(format!("status {}: {}", status.as_u16(), text)));
            }
            Err(e) => return Err(LinkError::Http(format!("invalid JSON response: {}", e))),
        };

        let has_data = body.get("data").is_some_and(|data| !data.is_null());
        if !has_data {
            if let Some(errors) = body.get("errors") {
                return Err(LinkError::Graphql(errors.clone()));
            }
            if !status.is_success() {
                return Err(LinkError::Http(format!("status {}: {}", status.as_u16(), text)));
            }
        }

        Ok(body)
    }
}

impl Link for HttpLink {
    fn request(&self, operation: Operation, _forward: Forward<'_>) -> OperationStream {
        let link = self.clone();
        stream::once(async move { link.execute(&operation.request).await }).boxed()
    }
}
