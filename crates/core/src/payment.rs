//! Payment gateway request signing and result verification (VNPay protocol).
//!
//! The gateway is redirect-based: we build a signed URL, the user pays on the
//! gateway's site, and the gateway calls back (browser return + server IPN)
//! with signed query parameters. Signatures are HMAC-SHA512 over the
//! form-urlencoded, key-sorted `vnp_*` parameters.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::CoreError;
use crate::types::Timestamp;

type HmacSha512 = Hmac<Sha512>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Price of the supporter badge in VND.
pub const BADGE_PRICE_VND: i64 = 50_000;

/// Protocol version sent as `vnp_Version`.
pub const API_VERSION: &str = "2.1.0";

/// Response code the gateway uses for a successful payment.
pub const RESPONSE_SUCCESS: &str = "00";

pub const PAYMENT_PENDING: &str = "pending";
pub const PAYMENT_PAID: &str = "paid";
pub const PAYMENT_FAILED: &str = "failed";

/// Parameters excluded from the signed payload.
const SIGNATURE_PARAMS: &[&str] = &["vnp_SecureHash", "vnp_SecureHashType"];

/// IPN acknowledgement codes expected by the gateway.
pub mod ipn {
    pub const CONFIRMED: &str = "00";
    pub const ORDER_NOT_FOUND: &str = "01";
    pub const ALREADY_CONFIRMED: &str = "02";
    pub const INVALID_AMOUNT: &str = "04";
    pub const INVALID_SIGNATURE: &str = "97";
    pub const UNKNOWN_ERROR: &str = "99";
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Everything needed to build a payment redirect URL.
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    pub tmn_code: &'a str,
    pub amount_vnd: i64,
    pub order_ref: &'a str,
    pub order_info: &'a str,
    pub return_url: &'a str,
    pub ip_addr: &'a str,
    pub created_at: Timestamp,
}

/// Build the signed gateway URL for `request`.
pub fn build_payment_url(gateway_url: &str, hash_secret: &str, request: &PaymentRequest<'_>) -> String {
    let mut params = BTreeMap::new();
    params.insert("vnp_Version", API_VERSION.to_string());
    params.insert("vnp_Command", "pay".to_string());
    params.insert("vnp_TmnCode", request.tmn_code.to_string());
    params.insert("vnp_Locale", "vn".to_string());
    params.insert("vnp_CurrCode", "VND".to_string());
    params.insert("vnp_TxnRef", request.order_ref.to_string());
    params.insert("vnp_OrderInfo", request.order_info.to_string());
    params.insert("vnp_OrderType", "other".to_string());
    // The gateway expects the amount in hundredths of a dong.
    params.insert("vnp_Amount", (request.amount_vnd * 100).to_string());
    params.insert("vnp_ReturnUrl", request.return_url.to_string());
    params.insert("vnp_IpAddr", request.ip_addr.to_string());
    params.insert("vnp_CreateDate", gateway_timestamp(request.created_at));

    let query = encode_sorted(params.iter().map(|(k, v)| (*k, v.as_str())));
    let signature = sign(&query, hash_secret);
    format!("{gateway_url}?{query}&vnp_SecureHash={signature}")
}

/// Format a timestamp as `yyyyMMddHHmmss` in Vietnam time (UTC+7).
pub fn gateway_timestamp(at: Timestamp) -> String {
    let offset = FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset");
    at.with_timezone(&offset).format("%Y%m%d%H%M%S").to_string()
}

/// Build an order reference unique per user and instant.
pub fn order_reference(user_id: i64, at: Timestamp) -> String {
    format!("{}{:06}", at.format("%Y%m%d%H%M%S%3f"), user_id % 1_000_000)
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Form-urlencode key/value pairs in the order given.
fn encode_sorted<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// HMAC-SHA512 of `data`, hex encoded.
pub fn sign(data: &str, secret: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Verify the `vnp_SecureHash` of callback parameters.
///
/// Only `vnp_*` parameters take part in the signature; the hash fields
/// themselves are excluded.
pub fn verify_signature(params: &BTreeMap<String, String>, hash_secret: &str) -> bool {
    let Some(provided) = params.get("vnp_SecureHash") else {
        return false;
    };
    let signed = params
        .iter()
        .filter(|(k, v)| {
            k.starts_with("vnp_") && !SIGNATURE_PARAMS.contains(&k.as_str()) && !v.is_empty()
        })
        .map(|(k, v)| (k.as_str(), v.as_str()));
    let expected = sign(&encode_sorted(signed), hash_secret);
    expected.eq_ignore_ascii_case(provided)
}

// ---------------------------------------------------------------------------
// Callback results
// ---------------------------------------------------------------------------

/// A verified callback from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResult {
    pub order_ref: String,
    pub amount_vnd: i64,
    pub response_code: String,
    pub transaction_no: Option<String>,
}

impl GatewayResult {
    pub fn is_success(&self) -> bool {
        self.response_code == RESPONSE_SUCCESS
    }
}

/// Extract the payment outcome from (already verified) callback parameters.
pub fn parse_result(params: &BTreeMap<String, String>) -> Result<GatewayResult, CoreError> {
    let field = |name: &str| {
        params
            .get(name)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| CoreError::Validation(format!("Missing gateway parameter {name}")))
    };

    let amount_raw: i64 = field("vnp_Amount")?
        .parse()
        .map_err(|_| CoreError::Validation("vnp_Amount must be an integer".into()))?;

    Ok(GatewayResult {
        order_ref: field("vnp_TxnRef")?,
        amount_vnd: amount_raw / 100,
        response_code: field("vnp_ResponseCode")?,
        transaction_no: params.get("vnp_TransactionNo").cloned(),
    })
}
