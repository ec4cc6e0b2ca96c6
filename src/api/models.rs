use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ledger::models::{Plan, Subscription, TransactionStatus};

/// POST /payment/create-order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "plan is required"))]
    pub plan: String,
}

/// POST /payment/verify
///
/// Fields default to empty so a missing field reports as a validation
/// failure instead of a JSON rejection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "paymentId is required"))]
    pub payment_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "plan is required"))]
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<uuid::Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub plan: Plan,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub settled: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
