use super::models::*;
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use tracing::{debug, info};
use uuid::Uuid;

/// Durable ledger of transactions, subscriptions and credit balances.
///
/// Implementations must make `finalize_pending` atomic: the PENDING row is
/// claimed, updated, and (when valid) the subscription and credit grant are
/// written as one unit, so concurrent callers cannot both observe PENDING.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_pending_transaction(&self, new: &NewTransaction) -> Result<Transaction, StoreError>;

    /// Returns `None` when no PENDING transaction exists for (user, order).
    async fn finalize_pending(
        &self,
        finalization: &Finalization,
    ) -> Result<Option<FinalizedTransaction>, StoreError>;

    async fn get_transaction(&self, user_id: &str, order_id: &str) -> Result<Option<Transaction>, StoreError>;

    async fn get_credit_balance(&self, user_id: &str) -> Result<Option<CreditBalance>, StoreError>;

    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Ledger repository - THE source of truth for payment state
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin_tx(&self) -> Result<PgTransaction<'_, Postgres>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    async fn create_subscription(
        tx: &mut PgTransaction<'_, Postgres>,
        finalization: &Finalization,
    ) -> Result<Subscription, StoreError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, user_id, plan, payment_id, order_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, plan, payment_id, order_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&finalization.user_id)
        .bind(finalization.plan)
        .bind(&finalization.payment_id)
        .bind(&finalization.order_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(subscription)
    }

    /// Atomic increment; the first grant creates the row
    async fn add_credits(
        tx: &mut PgTransaction<'_, Postgres>,
        user_id: &str,
        credits: i64,
    ) -> Result<CreditBalance, StoreError> {
        let balance = sqlx::query_as::<_, CreditBalance>(
            r#"
            INSERT INTO credit_balances (user_id, amount)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET amount = credit_balances.amount + EXCLUDED.amount, updated_at = NOW()
            RETURNING user_id, amount, updated_at
            "#,
        )
        .bind(user_id)
        .bind(credits)
        .fetch_one(&mut **tx)
        .await?;

        Ok(balance)
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    // ========== TRANSACTION OPERATIONS ==========

    async fn create_pending_transaction(&self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, user_id, amount, currency, plan, order_id, payment_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, '', $7)
            RETURNING id, user_id, amount, currency, plan, order_id, payment_id, status,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.user_id)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(new.plan)
        .bind(&new.order_id)
        .bind(TransactionStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        debug!("Recorded pending transaction {} for order {}", transaction.id, transaction.order_id);
        Ok(transaction)
    }

    async fn finalize_pending(
        &self,
        finalization: &Finalization,
    ) -> Result<Option<FinalizedTransaction>, StoreError> {
        let mut tx = self.begin_tx().await?;

        // Row lock serializes concurrent settlement attempts for the same order
        let pending = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, currency, plan, order_id, payment_id, status,
                   created_at, updated_at
            FROM transactions
            WHERE user_id = $1 AND order_id = $2 AND status = $3
            FOR UPDATE
            "#,
        )
        .bind(&finalization.user_id)
        .bind(&finalization.order_id)
        .bind(TransactionStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(pending) = pending else {
            tx.rollback().await?;
            return Ok(None);
        };

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET payment_id = $2, status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING id, user_id, amount, currency, plan, order_id, payment_id, status,
                      created_at, updated_at
            "#,
        )
        .bind(pending.id)
        .bind(&finalization.payment_id)
        .bind(TransactionStatus::settled(finalization.valid))
        .bind(TransactionStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        let (subscription, credit_balance) = if finalization.valid {
            let subscription = Self::create_subscription(&mut tx, finalization).await?;
            let balance = Self::add_credits(&mut tx, &finalization.user_id, finalization.credits).await?;
            (Some(subscription), Some(balance))
        } else {
            (None, None)
        };

        tx.commit().await?;

        info!(
            "✓ Transaction {} finalized as {:?} (order {})",
            transaction.id, transaction.status, transaction.order_id
        );

        Ok(Some(FinalizedTransaction {
            transaction,
            subscription,
            credit_balance,
        }))
    }

    async fn get_transaction(&self, user_id: &str, order_id: &str) -> Result<Option<Transaction>, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, currency, plan, order_id, payment_id, status,
                   created_at, updated_at
            FROM transactions
            WHERE user_id = $1 AND order_id = $2
            "#,
        )
        .bind(user_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    // ========== CREDIT & SUBSCRIPTION READS ==========

    async fn get_credit_balance(&self, user_id: &str) -> Result<Option<CreditBalance>, StoreError> {
        let balance = sqlx::query_as::<_, CreditBalance>(
            r#"
            SELECT user_id, amount, updated_at
            FROM credit_balances
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, plan, payment_id, order_id, created_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
