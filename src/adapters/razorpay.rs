use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use crate::error::GatewayError;

pub const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// Razorpay Orders API client
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        // Bounded so a hung gateway cannot stall settlement
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn parse_order(response: Response) -> Result<GatewayOrder, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RazorpayErrorBody>(&text)
                .map(|body| format!("{}: {}", body.error.code, body.error.description))
                .unwrap_or(text);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<GatewayOrder>().await?)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    fn public_key(&self) -> &str {
        &self.config.key_id
    }

    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        debug!("Creating Razorpay order: amount={} {} receipt={}", request.amount, request.currency, request.receipt);

        let response = self
            .client
            .post(self.url("orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(request)
            .send()
            .await?;

        let order = Self::parse_order(response).await?;
        info!("💳 Razorpay order created: {}", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        if order_id.is_empty() || !order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "Malformed order id".to_string(),
            });
        }

        let response = self
            .client
            .get(self.url(&format!("orders/{}", order_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        let order = Self::parse_order(response).await?;
        debug!(
            "Fetched Razorpay order {}: status={} receipt={}",
            order.id,
            order.status,
            order.receipt.as_deref().unwrap_or("-")
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(api_url: &str) -> RazorpayGateway {
        RazorpayGateway::new(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "secret".to_string(),
            api_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        assert_eq!(gateway(DEFAULT_API_URL).url("orders"), "https://api.razorpay.com/v1/orders");
        assert_eq!(gateway("http://localhost:9000/v1/").url("orders/order_1"), "http://localhost:9000/v1/orders/order_1");
    }

    #[tokio::test]
    async fn test_fetch_rejects_path_injection() {
        let result = gateway(DEFAULT_API_URL).fetch_order("../payments").await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: 400, .. })));
    }
}
