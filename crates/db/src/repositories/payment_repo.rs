//! Repository for the `payments` table.

use chatstory_core::payment::{PAYMENT_FAILED, PAYMENT_PAID, PAYMENT_PENDING};
use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::{Payment, SettleOutcome};

const COLUMNS: &str = "id, user_id, order_ref, amount, status, gateway_txn_no, response_code, \
                       paid_at, created_at, updated_at";

/// Provides badge payment bookkeeping.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Record a pending payment before redirecting to the gateway.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        order_ref: &str,
        amount: i64,
    ) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (user_id, order_ref, amount, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(user_id)
            .bind(order_ref)
            .bind(amount)
            .bind(PAYMENT_PENDING)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_order_ref(
        pool: &PgPool,
        order_ref: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE order_ref = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(order_ref)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a verified gateway result to a pending payment.
    ///
    /// A successful result with the expected amount marks the payment `paid`
    /// and grants the owner's badge in the same transaction. Any other result
    /// marks it `failed`. Already-settled payments are left untouched.
    pub async fn settle(
        pool: &PgPool,
        order_ref: &str,
        amount: i64,
        success: bool,
        gateway_txn_no: Option<&str>,
        response_code: &str,
    ) -> Result<SettleOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM payments WHERE order_ref = $1 FOR UPDATE");
        let Some(payment) = sqlx::query_as::<_, Payment>(&query)
            .bind(order_ref)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(SettleOutcome::NotFound);
        };

        if payment.status != PAYMENT_PENDING {
            return Ok(SettleOutcome::AlreadySettled(payment));
        }

        let amount_matches = payment.amount == amount;
        let paid = success && amount_matches;

        let query = format!(
            "UPDATE payments SET
                status = $2,
                gateway_txn_no = $3,
                response_code = $4,
                paid_at = CASE WHEN $5 THEN NOW() ELSE NULL END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Payment>(&query)
            .bind(payment.id)
            .bind(if paid { PAYMENT_PAID } else { PAYMENT_FAILED })
            .bind(gateway_txn_no)
            .bind(response_code)
            .bind(paid)
            .fetch_one(&mut *tx)
            .await?;

        if paid {
            sqlx::query(
                "UPDATE users SET has_badge = true, badge_granted_at = COALESCE(badge_granted_at, NOW())
                 WHERE id = $1",
            )
            .bind(updated.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if amount_matches {
            Ok(SettleOutcome::Settled(updated))
        } else {
            Ok(SettleOutcome::AmountMismatch(updated))
        }
    }
}
