use config::ConfigError;
use std::time::Duration;

use crate::adapters::{razorpay::DEFAULT_API_URL, RazorpayConfig};
use crate::payments::{PaymentSettings, PlanCatalog, RetryPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub razorpay: RazorpayConfig,
    pub payments: PaymentSettings,
    pub auth: AuthConfig,
    /// Identity-provider webhook signing secret; webhook route rejects everything when unset
    pub webhook_signing_secret: Option<String>,
    pub rate_limit_per_minute: u32,
    /// Comma-separated CORS allow-list; any origin when unset
    pub cors_origins: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// RS256 public key (PEM) or, for local development, an HS256 secret
    pub jwt_key: String,
    pub issuer: Option<String>,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::NotFound(name.to_string()))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Message(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway_timeout = parsed("GATEWAY_TIMEOUT_SECS", 10u64)?;
        let retry = RetryPolicy {
            max_attempts: parsed("STORE_RETRY_ATTEMPTS", 3u32)?,
            initial_delay: Duration::from_millis(parsed("STORE_RETRY_DELAY_MS", 1000u64)?),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/payments".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            razorpay: RazorpayConfig {
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_KEY_SECRET")?,
                api_url: std::env::var("RAZORPAY_API_URL")
                    .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
                timeout: Duration::from_secs(gateway_timeout),
            },
            payments: PaymentSettings {
                catalog: PlanCatalog::default(),
                currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                merchant_name: std::env::var("MERCHANT_NAME").unwrap_or_else(|_| "PhotoAI".to_string()),
                theme_color: "#000000".to_string(),
                retry,
            },
            auth: AuthConfig {
                // Keys pasted into .env usually carry escaped newlines
                jwt_key: required("CLERK_JWT_PUBLIC_KEY")?.replace("\\n", "\n"),
                issuer: std::env::var("CLERK_ISSUER").ok().filter(|v| !v.is_empty()),
            },
            webhook_signing_secret: std::env::var("SIGNING_SECRET").ok().filter(|v| !v.is_empty()),
            rate_limit_per_minute: parsed("RATE_LIMIT_PER_MINUTE", 120u32)?,
            cors_origins: std::env::var("CORS_ORIGINS").ok().filter(|v| !v.trim().is_empty()),
        })
    }
}
