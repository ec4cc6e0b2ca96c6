use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::auth::{AuthUser, JwtVerifier};
use super::models::*;
use crate::{
    error::{AppError, AppResult},
    ledger::{models::Plan, LedgerStore},
    middleware::{PaymentRateLimiter, ValidatedJson},
    payments::{OrderPayload, OrderService, SettlementRequest, SettlementService},
};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub orders: Arc<OrderService>,
    pub settlement: Arc<SettlementService>,
    pub auth: Arc<JwtVerifier>,
    pub rate_limiter: PaymentRateLimiter,
    /// Identity-provider webhook secret (base64, optional `whsec_` prefix)
    pub webhook_secret: Option<String>,
}

/// Create a gateway order for the caller
/// POST /payment/create-order
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateOrderRequest>,
) -> AppResult<Json<OrderPayload>> {
    let plan: Plan = request.plan.parse()?;
    info!("Creating {} order for user {}", plan, user.user_id);

    let payload = state
        .orders
        .create_order(&user.user_id, user.email.as_deref(), plan)
        .await?;

    Ok(Json(payload))
}

/// Settle a client-reported payment completion
/// POST /payment/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<VerifyPaymentRequest>,
) -> AppResult<(StatusCode, Json<VerifyPaymentResponse>)> {
    let plan: Plan = request.plan.parse()?;

    let settlement = state
        .settlement
        .settle(SettlementRequest {
            user_id: user.user_id,
            plan,
            order_id: request.order_id,
            payment_id: request.payment_id,
            signature: request.signature,
        })
        .await?;

    if !settlement.success {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyPaymentResponse {
                success: false,
                message: "Invalid payment signature".to_string(),
                status: Some(settlement.transaction.status),
                credits: None,
                subscription_id: None,
            }),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(VerifyPaymentResponse {
            success: true,
            message: "Payment verified successfully".to_string(),
            status: Some(settlement.transaction.status),
            credits: settlement.credit_balance.map(|b| b.amount),
            subscription_id: settlement.subscription.map(|s| s.id),
        }),
    ))
}

/// Status of one of the caller's orders
/// GET /payment/orders/:order_id
pub async fn get_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<OrderStatusResponse>> {
    let transaction = state
        .ledger
        .get_transaction(&user.user_id, &order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

    Ok(Json(OrderStatusResponse {
        order_id: transaction.order_id,
        plan: transaction.plan,
        amount: transaction.amount,
        currency: transaction.currency,
        settled: transaction.status.is_terminal(),
        status: transaction.status,
        updated_at: transaction.updated_at,
    }))
}

/// GET /payment/credits
pub async fn get_credits(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<CreditsResponse>> {
    let credits = state
        .ledger
        .get_credit_balance(&user.user_id)
        .await?
        .map(|b| b.amount)
        .unwrap_or(0);

    Ok(Json(CreditsResponse { credits }))
}

/// GET /payment/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<SubscriptionsResponse>> {
    let subscriptions = state.ledger.list_subscriptions(&user.user_id).await?;
    Ok(Json(SubscriptionsResponse { subscriptions }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.ledger.ping().await {
        Ok(()) => "up",
        Err(e) => {
            warn!("Health check: ledger store unreachable: {}", e);
            "down"
        }
    };

    Json(HealthResponse {
        status: if database == "up" { "healthy" } else { "degraded" }.to_string(),
        database: database.to_string(),
        timestamp: Utc::now(),
    })
}
