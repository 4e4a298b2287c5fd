//! Badge payment entity model.

use chatstory_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub user_id: DbId,
    pub order_ref: String,
    pub amount: i64,
    pub status: String,
    pub gateway_txn_no: Option<String>,
    pub response_code: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of applying a gateway callback to a payment.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// No payment with that order reference.
    NotFound,
    /// The payment was already paid or failed; nothing changed.
    AlreadySettled(Payment),
    /// The reported amount differs from the stored one; the payment failed.
    AmountMismatch(Payment),
    /// The payment moved to `paid` or `failed`.
    Settled(Payment),
}
