use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Subscription tier. The set is fixed; prices live in the plan catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "plan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Premium,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Premium => "premium",
        }
    }

    #[cfg(test)]
    pub fn all() -> Vec<Plan> {
        vec![Plan::Basic, Plan::Premium]
    }
}

impl FromStr for Plan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            _ => Err(AppError::Validation("Invalid plan".to_string())),
        }
    }
}

/// Transaction status. Only PENDING -> SUCCESS and PENDING -> FAILED are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn settled(valid: bool) -> Self {
        if valid {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        }
    }
}

/// Transaction entity - one attempted payment, kept forever as an audit trail
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    /// Minor currency units (paise for INR)
    pub amount: i64,
    pub currency: String,
    pub plan: Plan,
    pub order_id: String,
    /// Empty until settlement
    pub payment_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

/// Fields needed to record a freshly created gateway order
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub plan: Plan,
    pub order_id: String,
}

/// Subscription entity - immutable plan entitlement
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub plan: Plan,
    pub payment_id: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,
}

/// Credit balance (one row per user)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditBalance {
    pub user_id: String,
    pub amount: i64,
    pub updated_at: DateTime<Utc>,
}

/// Instruction to move a PENDING transaction to its terminal state
#[derive(Debug, Clone)]
pub struct Finalization {
    pub user_id: String,
    pub order_id: String,
    pub payment_id: String,
    pub plan: Plan,
    /// Credits granted when `valid`
    pub credits: i64,
    pub valid: bool,
}

/// Result of a committed finalization
#[derive(Debug, Clone)]
pub struct FinalizedTransaction {
    pub transaction: Transaction,
    /// Present only for SUCCESS
    pub subscription: Option<Subscription>,
    /// Present only for SUCCESS
    pub credit_balance: Option<CreditBalance>,
}
