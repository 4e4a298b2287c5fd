//! Route definitions for `/payments` and `/badges`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{badges, payments};
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// GET  /              -> list_mine (requires auth)
/// POST /badge         -> create_badge_payment (requires auth)
/// GET  /vnpay-return  -> vnpay_return (public, signed)
/// GET  /vnpay-ipn     -> vnpay_ipn (public, signed)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(payments::list_mine))
        .route("/badge", post(payments::create_badge_payment))
        .route("/vnpay-return", get(payments::vnpay_return))
        .route("/vnpay-ipn", get(payments::vnpay_ipn))
}

/// Routes mounted at `/badges`.
///
/// ```text
/// POST /free  -> grant_free
/// ```
pub fn badge_router() -> Router<AppState> {
    Router::new().route("/free", post(badges::grant_free))
}
