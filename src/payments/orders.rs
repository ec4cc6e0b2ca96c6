use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::retry::with_retry;
use super::PaymentSettings;
use crate::adapters::{GatewayOrderRequest, OrderNotes, PaymentGateway};
use crate::error::AppResult;
use crate::ledger::{
    models::{NewTransaction, Plan},
    LedgerStore,
};

/// Checkout widget payload returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    pub key: String,
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
    pub notes: OrderNotes,
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub color: String,
}

/// Creates gateway orders and records them as PENDING transactions
pub struct OrderService {
    ledger: Arc<dyn LedgerStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<PaymentSettings>,
}

impl OrderService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: Arc<PaymentSettings>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            settings,
        }
    }

    /// Receipt ids only need to be unique per merchant; gateway caps them at 40 chars
    fn new_receipt() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("rcpt_{}_{}", chrono::Utc::now().timestamp_millis(), &suffix[..8])
    }

    pub async fn create_order(&self, user_id: &str, email: Option<&str>, plan: Plan) -> AppResult<OrderPayload> {
        let terms = self.settings.catalog.terms(plan)?;
        let amount = terms.amount_minor();
        let notes = OrderNotes {
            user_id: user_id.to_string(),
            plan: plan.as_str().to_string(),
        };

        let request = GatewayOrderRequest {
            amount,
            currency: self.settings.currency.clone(),
            receipt: Self::new_receipt(),
            notes: notes.clone(),
        };

        // Not retried: a repeated create would open a second gateway order
        let order = self.gateway.create_order(&request).await?;

        let new_transaction = NewTransaction {
            user_id: user_id.to_string(),
            amount,
            currency: self.settings.currency.clone(),
            plan,
            order_id: order.id.clone(),
        };

        let ledger = self.ledger.clone();
        let transaction = with_retry(self.settings.retry, || {
            let ledger = ledger.clone();
            let new_transaction = new_transaction.clone();
            async move { ledger.create_pending_transaction(&new_transaction).await }
        })
        .await
        .map_err(|e| {
            // Gateway order is now orphaned; settlement will refuse it
            error!("Failed to persist pending transaction for gateway order {}: {}", order.id, e);
            e
        })?;

        info!(
            "🧾 Order {} created for user {} ({}, {} {})",
            transaction.order_id, user_id, plan, amount, transaction.currency
        );

        Ok(OrderPayload {
            key: self.gateway.public_key().to_string(),
            amount,
            currency: self.settings.currency.clone(),
            name: self.settings.merchant_name.clone(),
            description: self.settings.catalog.describe(plan)?,
            order_id: order.id,
            prefill: Prefill {
                name: String::new(),
                email: email.unwrap_or_default().to_string(),
            },
            notes,
            theme: Theme {
                color: self.settings.theme_color.clone(),
            },
        })
    }
}
