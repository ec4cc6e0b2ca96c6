use std::sync::Arc;
use tracing::{info, warn};

use super::retry::with_retry;
use super::signature::SignatureVerifier;
use super::PaymentSettings;
use crate::adapters::{GatewayOrder, PaymentGateway};
use crate::error::{AppError, AppResult};
use crate::ledger::{
    models::{CreditBalance, Finalization, Plan, Subscription, Transaction},
    LedgerStore,
};

/// Client-reported payment completion
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub user_id: String,
    pub plan: Plan,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Outcome of a settlement that found its PENDING transaction
#[derive(Debug, Clone)]
pub struct Settlement {
    pub success: bool,
    pub transaction: Transaction,
    pub subscription: Option<Subscription>,
    pub credit_balance: Option<CreditBalance>,
}

/// Verifies payment completions and converts them into subscriptions and credits
pub struct SettlementService {
    ledger: Arc<dyn LedgerStore>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: Arc<dyn SignatureVerifier>,
    settings: Arc<PaymentSettings>,
}

impl SettlementService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: Arc<dyn SignatureVerifier>,
        settings: Arc<PaymentSettings>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            verifier,
            settings,
        }
    }

    fn validate(request: &SettlementRequest) -> AppResult<()> {
        let missing = [
            ("userId", &request.user_id),
            ("orderId", &request.order_id),
            ("paymentId", &request.payment_id),
            ("signature", &request.signature),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// The gateway's record must describe the order this user paid for
    fn cross_check(&self, request: &SettlementRequest, order: &GatewayOrder) -> AppResult<bool> {
        let expected_amount = self.settings.catalog.terms(request.plan)?.amount_minor();
        let mut mismatches = Vec::new();

        if order.amount != expected_amount {
            mismatches.push(format!("amount {} != {}", order.amount, expected_amount));
        }
        if order.currency != self.settings.currency {
            mismatches.push(format!("currency {} != {}", order.currency, self.settings.currency));
        }
        if let Some(user) = order.note("userId") {
            if user != request.user_id {
                mismatches.push("userId note".to_string());
            }
        }
        if let Some(plan) = order.note("plan") {
            if plan != request.plan.as_str() {
                mismatches.push(format!("plan note {} != {}", plan, request.plan));
            }
        }

        if !mismatches.is_empty() {
            warn!(
                target: "security",
                "Gateway order {} does not match settlement by {}: {}",
                request.order_id,
                request.user_id,
                mismatches.join("; ")
            );
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn settle(&self, request: SettlementRequest) -> AppResult<Settlement> {
        Self::validate(&request)?;
        let terms = self.settings.catalog.terms(request.plan)?;

        // 1. Signature authenticity
        let signature_valid = self
            .verifier
            .verify(&request.order_id, &request.payment_id, &request.signature);
        if !signature_valid {
            warn!(
                target: "security",
                "Invalid payment signature for order {} (user {})",
                request.order_id, request.user_id
            );
        }

        // 2. Canonical order from the gateway, not retried
        let order = self.gateway.fetch_order(&request.order_id).await?;
        let is_valid = signature_valid && self.cross_check(&request, &order)?;

        // 3-5. Claim the PENDING row, finalize it, grant on success: one unit of work
        let finalization = Finalization {
            user_id: request.user_id.clone(),
            order_id: request.order_id.clone(),
            payment_id: request.payment_id.clone(),
            plan: request.plan,
            credits: terms.credits,
            valid: is_valid,
        };

        let ledger = self.ledger.clone();
        let finalized = with_retry(self.settings.retry, || {
            let ledger = ledger.clone();
            let finalization = finalization.clone();
            async move { ledger.finalize_pending(&finalization).await }
        })
        .await?
        .ok_or_else(|| {
            AppError::Reconciliation(format!(
                "no pending transaction for this order (order {}, user {})",
                request.order_id, request.user_id
            ))
        })?;

        if is_valid {
            info!(
                "✅ Payment {} settled: {} credits granted to {} ({})",
                request.payment_id, terms.credits, request.user_id, request.plan
            );
        } else {
            info!("❌ Payment {} for order {} marked FAILED", request.payment_id, request.order_id);
        }

        Ok(Settlement {
            success: is_valid,
            transaction: finalized.transaction,
            subscription: finalized.subscription,
            credit_balance: finalized.credit_balance,
        })
    }
}
