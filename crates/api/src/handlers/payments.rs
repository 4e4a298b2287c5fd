//! Badge purchases through the redirect-based payment gateway.
//!
//! Flow: `POST /payments/badge` stores a pending payment and returns the
//! signed gateway URL. After payment the gateway calls back twice: the
//! browser is sent to `vnpay-return`, and the gateway's server calls
//! `vnpay-ipn`. Both verify the signature and settle the payment; settling
//! is idempotent so whichever arrives second is a no-op.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_core::payment::{
    build_payment_url, ipn, order_reference, parse_result, verify_signature, GatewayResult,
    PaymentRequest, BADGE_PRICE_VND,
};
use chatstory_db::models::payment::{Payment, SettleOutcome};
use chatstory_db::repositories::{PaymentRepo, UserRepo};
use chatstory_events::bus::BADGE_GRANTED;
use chatstory_events::StoryEvent;
use chrono::Utc;
use serde::Serialize;

use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const ORDER_INFO: &str = "ChatStory supporter badge";

#[derive(Debug, Serialize)]
pub struct PaymentCreated {
    pub payment_url: String,
    pub order_ref: String,
    pub amount: i64,
}

/// Outcome reported to the browser after the gateway redirect.
#[derive(Debug, Serialize)]
pub struct PaymentResult {
    pub order_ref: String,
    pub status: String,
    pub success: bool,
    pub response_code: String,
}

/// Acknowledgement body the gateway expects from the IPN endpoint.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl IpnResponse {
    fn new(rsp_code: &'static str, message: &'static str) -> Self {
        Self { rsp_code, message }
    }
}

fn payment_config(state: &AppState) -> AppResult<&PaymentConfig> {
    state
        .config
        .payment
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".into()))
}

/// First address in `X-Forwarded-For`, or loopback.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}

/// POST /api/v1/payments/badge
pub async fn create_badge_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<DataResponse<PaymentCreated>>)> {
    let config = payment_config(&state)?;

    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth_user.user_id))?;
    if user.has_badge {
        return Err(AppError::Core(CoreError::Conflict(
            "You already have the supporter badge".into(),
        )));
    }

    let now = Utc::now();
    let order_ref = order_reference(user.id, now);
    PaymentRepo::create(&state.pool, user.id, &order_ref, BADGE_PRICE_VND).await?;

    let ip_addr = client_ip(&headers);
    let payment_url = build_payment_url(
        &config.gateway_url,
        &config.hash_secret,
        &PaymentRequest {
            tmn_code: &config.tmn_code,
            amount_vnd: BADGE_PRICE_VND,
            order_ref: &order_ref,
            order_info: ORDER_INFO,
            return_url: &config.return_url,
            ip_addr: &ip_addr,
            created_at: now,
        },
    );

    tracing::info!(user_id = user.id, order_ref = %order_ref, "Badge payment created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PaymentCreated {
                payment_url,
                order_ref,
                amount: BADGE_PRICE_VND,
            },
        }),
    ))
}

/// GET /api/v1/payments
pub async fn list_mine(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Payment>>>> {
    let payments = PaymentRepo::list_by_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: payments }))
}

/// GET /api/v1/payments/vnpay-return
///
/// Browser redirect target. Answers 400 when the signature does not verify.
pub async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<DataResponse<PaymentResult>>> {
    let config = payment_config(&state)?;
    if !verify_signature(&params, &config.hash_secret) {
        tracing::warn!("Payment return with invalid signature");
        return Err(AppError::BadRequest("Invalid payment signature".into()));
    }
    let result = parse_result(&params)?;

    let payment = match settle(&state, &result).await? {
        SettleOutcome::NotFound => {
            return Err(AppError::BadRequest(format!(
                "Unknown order reference {}",
                result.order_ref
            )))
        }
        SettleOutcome::AlreadySettled(p)
        | SettleOutcome::AmountMismatch(p)
        | SettleOutcome::Settled(p) => p,
    };

    Ok(Json(DataResponse {
        data: PaymentResult {
            success: payment.status == chatstory_core::payment::PAYMENT_PAID,
            order_ref: payment.order_ref,
            status: payment.status,
            response_code: result.response_code,
        },
    }))
}

/// GET /api/v1/payments/vnpay-ipn
///
/// Server-to-server notification. Always answers 200; the outcome is carried
/// in `RspCode` as the gateway requires.
pub async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<IpnResponse> {
    let Some(config) = state.config.payment.as_ref() else {
        return Json(IpnResponse::new(ipn::UNKNOWN_ERROR, "Payments not configured"));
    };
    if !verify_signature(&params, &config.hash_secret) {
        tracing::warn!("Payment IPN with invalid signature");
        return Json(IpnResponse::new(ipn::INVALID_SIGNATURE, "Invalid signature"));
    }
    let Ok(result) = parse_result(&params) else {
        return Json(IpnResponse::new(ipn::UNKNOWN_ERROR, "Invalid request"));
    };

    let response = match settle(&state, &result).await {
        Ok(outcome) => ipn_response(&outcome),
        Err(e) => {
            tracing::error!(error = %e, order_ref = %result.order_ref, "Payment IPN failed");
            IpnResponse::new(ipn::UNKNOWN_ERROR, "Unknown error")
        }
    };
    Json(response)
}

fn ipn_response(outcome: &SettleOutcome) -> IpnResponse {
    match outcome {
        SettleOutcome::NotFound => IpnResponse::new(ipn::ORDER_NOT_FOUND, "Order not found"),
        SettleOutcome::AlreadySettled(_) => {
            IpnResponse::new(ipn::ALREADY_CONFIRMED, "Order already confirmed")
        }
        SettleOutcome::AmountMismatch(_) => IpnResponse::new(ipn::INVALID_AMOUNT, "Invalid amount"),
        SettleOutcome::Settled(_) => IpnResponse::new(ipn::CONFIRMED, "Confirm Success"),
    }
}

/// Apply a verified gateway result and announce a newly granted badge.
async fn settle(state: &AppState, result: &GatewayResult) -> AppResult<SettleOutcome> {
    let outcome = PaymentRepo::settle(
        &state.pool,
        &result.order_ref,
        result.amount_vnd,
        result.is_success(),
        result.transaction_no.as_deref(),
        &result.response_code,
    )
    .await?;

    match &outcome {
        SettleOutcome::Settled(payment) => {
            tracing::info!(
                order_ref = %payment.order_ref,
                status = %payment.status,
                response_code = %result.response_code,
                "Payment settled"
            );
            if payment.status == chatstory_core::payment::PAYMENT_PAID {
                state
                    .event_bus
                    .publish(StoryEvent::new(BADGE_GRANTED).with_actor(payment.user_id));
            }
        }
        SettleOutcome::AmountMismatch(payment) => {
            tracing::warn!(
                order_ref = %payment.order_ref,
                expected = payment.amount,
                reported = result.amount_vnd,
                "Payment amount mismatch"
            );
        }
        SettleOutcome::AlreadySettled(_) | SettleOutcome::NotFound => {}
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chatstory_db::models::payment::Payment;

    use super::*;

    fn payment(status: &str) -> Payment {
        Payment {
            id: 1,
            user_id: 2,
            order_ref: "ref".into(),
            amount: BADGE_PRICE_VND,
            status: status.into(),
            gateway_txn_no: None,
            response_code: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ipn_codes_follow_outcome() {
        assert_eq!(ipn_response(&SettleOutcome::NotFound).rsp_code, ipn::ORDER_NOT_FOUND);
        assert_eq!(
            ipn_response(&SettleOutcome::AlreadySettled(payment("paid"))).rsp_code,
            ipn::ALREADY_CONFIRMED
        );
        assert_eq!(
            ipn_response(&SettleOutcome::AmountMismatch(payment("failed"))).rsp_code,
            ipn::INVALID_AMOUNT
        );
        assert_eq!(
            ipn_response(&SettleOutcome::Settled(payment("failed"))).rsp_code,
            ipn::CONFIRMED
        );
    }

    #[test]
    fn client_ip_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "127.0.0.1");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn ipn_response_serialises_gateway_field_names() {
        let body = serde_json::to_value(IpnResponse::new(ipn::CONFIRMED, "Confirm Success")).unwrap();
        assert_eq!(body["RspCode"], "00");
        assert_eq!(body["Message"], "Confirm Success");
    }
}
