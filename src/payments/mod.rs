// Payment order creation and settlement
pub mod orders;
pub mod plans;
pub mod retry;
pub mod settlement;
pub mod signature;

pub use orders::{OrderPayload, OrderService};
pub use plans::PlanCatalog;
pub use retry::RetryPolicy;
pub use settlement::{SettlementRequest, SettlementService};
pub use signature::HmacSignatureVerifier;

/// Static payment configuration shared by the order and settlement services
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub catalog: PlanCatalog,
    pub currency: String,
    pub merchant_name: String,
    pub theme_color: String,
    pub retry: RetryPolicy,
}

#[cfg(test)]
impl PaymentSettings {
    pub fn for_tests() -> Self {
        Self {
            catalog: PlanCatalog::default(),
            currency: "INR".to_string(),
            merchant_name: "PhotoAI".to_string(),
            theme_color: "#000000".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}
