//! HTTP client for the order API.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;
use traft_core::{DraftId, OrderId};
use url::Url;

use super::{CreatedOrder, Order, OrderGateway, OrderSubmissionError};
use crate::config::OrderApiConfig;

/// Header carrying the checkout draft ID.
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest slice of an error body kept in [`OrderSubmissionError::Api`].
const MAX_ERROR_BODY: usize = 200;

/// Client for `POST /orders`.
#[derive(Debug, Clone)]
pub struct HttpOrderClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpOrderClient {
    /// Create a new order API client.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL or token is malformed, or the HTTP
    /// client fails to build.
    pub fn new(config: &OrderApiConfig) -> Result<Self, OrderSubmissionError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| OrderSubmissionError::Parse(format!("Invalid API token format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let endpoint = config
            .base_url
            .join("orders")
            .map_err(|e| OrderSubmissionError::Parse(format!("Invalid order API URL: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// The URL orders are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl OrderGateway for HttpOrderClient {
    #[instrument(skip(self, order), fields(endpoint = %self.endpoint, payment_mode = %order.payment_mode))]
    async fn create_order(
        &self,
        order: &Order,
        idempotency_key: DraftId,
    ) -> Result<OrderId, OrderSubmissionError> {
        order.validate()?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(order)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Order API returned non-success status"
            );
            return Err(OrderSubmissionError::Api {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let created: CreatedOrder = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OrderSubmissionError::Timeout
            } else {
                OrderSubmissionError::Parse(e.to_string())
            }
        })?;

        tracing::info!(order_id = %created.order_id, "Order created");
        Ok(created.order_id)
    }
}

fn classify(error: reqwest::Error) -> OrderSubmissionError {
    if error.is_timeout() {
        OrderSubmissionError::Timeout
    } else {
        OrderSubmissionError::Http(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(base: &str) -> OrderApiConfig {
        OrderApiConfig {
            base_url: Url::parse(base).unwrap(),
            token: Some(SecretString::from("tok_live_8fK2pQ")),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_endpoint_joins_orders() {
        let client = HttpOrderClient::new(&config("https://api.traft.in/")).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://api.traft.in/orders");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = HttpOrderClient::new(&config("https://traft.in/api/")).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://traft.in/api/orders");
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let mut cfg = config("https://api.traft.in/");
        cfg.token = Some(SecretString::from("bad\ntoken"));
        assert!(matches!(
            HttpOrderClient::new(&cfg),
            Err(OrderSubmissionError::Parse(_))
        ));
    }
}
