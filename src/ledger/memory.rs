//! In-memory ledger used by the service and router tests.

use super::models::*;
use super::repository::LedgerStore;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    transactions: Vec<Transaction>,
    subscriptions: Vec<Subscription>,
    balances: HashMap<String, CreditBalance>,
}

#[derive(Default)]
pub struct MemoryLedger {
    tables: Mutex<Tables>,
    /// Number of upcoming write calls that fail as unreachable
    outages: AtomicU32,
    write_attempts: AtomicU32,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail with `StoreError::Unavailable`
    pub fn fail_next_writes(&self, count: u32) {
        self.outages.store(count, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.tables.lock().transactions.clone()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.tables.lock().subscriptions.clone()
    }

    pub fn credits(&self, user_id: &str) -> i64 {
        self.tables
            .lock()
            .balances
            .get(user_id)
            .map(|b| b.amount)
            .unwrap_or(0)
    }

    fn check_outage(&self) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.outages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.outages.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_pending_transaction(&self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        self.check_outage()?;
        let mut tables = self.tables.lock();

        if tables
            .transactions
            .iter()
            .any(|t| t.user_id == new.user_id && t.order_id == new.order_id)
        {
            return Err(StoreError::Conflict("transactions_user_order_unique".to_string()));
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            amount: new.amount,
            currency: new.currency.clone(),
            plan: new.plan,
            order_id: new.order_id.clone(),
            payment_id: String::new(),
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn finalize_pending(
        &self,
        finalization: &Finalization,
    ) -> Result<Option<FinalizedTransaction>, StoreError> {
        self.check_outage()?;
        // Single lock for the whole unit of work
        let mut tables = self.tables.lock();
        let now = Utc::now();

        let Some(pending) = tables.transactions.iter_mut().find(|t| {
            t.user_id == finalization.user_id && t.order_id == finalization.order_id && t.is_pending()
        }) else {
            return Ok(None);
        };

        pending.payment_id = finalization.payment_id.clone();
        pending.status = TransactionStatus::settled(finalization.valid);
        pending.updated_at = now;
        let transaction = pending.clone();

        if !finalization.valid {
            return Ok(Some(FinalizedTransaction {
                transaction,
                subscription: None,
                credit_balance: None,
            }));
        }

        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: finalization.user_id.clone(),
            plan: finalization.plan,
            payment_id: finalization.payment_id.clone(),
            order_id: finalization.order_id.clone(),
            created_at: now,
        };
        tables.subscriptions.push(subscription.clone());

        let balance = tables
            .balances
            .entry(finalization.user_id.clone())
            .or_insert_with(|| CreditBalance {
                user_id: finalization.user_id.clone(),
                amount: 0,
                updated_at: now,
            });
        balance.amount += finalization.credits;
        balance.updated_at = now;
        let credit_balance = balance.clone();

        Ok(Some(FinalizedTransaction {
            transaction,
            subscription: Some(subscription),
            credit_balance: Some(credit_balance),
        }))
    }

    async fn get_transaction(&self, user_id: &str, order_id: &str) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .tables
            .lock()
            .transactions
            .iter()
            .find(|t| t.user_id == user_id && t.order_id == order_id)
            .cloned())
    }

    async fn get_credit_balance(&self, user_id: &str) -> Result<Option<CreditBalance>, StoreError> {
        Ok(self.tables.lock().balances.get(user_id).cloned())
    }

    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .tables
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
