//! Payment reconciliation vocabulary and provider authenticity checks.
//!
//! Both providers end up producing a [`PaidEnrollment`]; everything here is
//! pure so the HTTP layer only has to fetch and forward provider data.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;

use crate::error::CoreError;
use crate::types::DbId;

type HmacSha256 = Hmac<Sha256>;

define_text_enum! {
    PaymentMethod {
        Stripe => "stripe",
        SslCommerz => "sslcommerz",
    }
}

/// Currency stored when a provider does not report one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// SSLCommerz validation statuses that count as a successful payment.
pub const SSL_VALID_STATUSES: &[&str] = &["VALID", "VALIDATED"];

/// A provider-confirmed payment, normalized for the enrollment upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct PaidEnrollment {
    pub course_id: DbId,
    pub student_id: DbId,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub transaction_id: String,
}

/// Upper-case a provider currency code, falling back to [`DEFAULT_CURRENCY`].
pub fn normalize_currency(currency: Option<&str>) -> String {
    match currency.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_ascii_uppercase(),
        _ => DEFAULT_CURRENCY.to_string(),
    }
}

/// Parse an id carried in provider metadata (`metadata.courseId`,
/// `value_a`, ...).
pub fn parse_metadata_id(raw: Option<&str>, field: &str) -> Result<DbId, CoreError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::UpstreamPayment(format!("Missing {field} in payment metadata")))?;
    raw.parse::<DbId>()
        .map_err(|_| CoreError::UpstreamPayment(format!("Invalid {field} '{raw}' in payment metadata")))
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

/// Compute the `v1` signature Stripe sends for `payload` at `timestamp`.
pub fn compute_stripe_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`).
///
/// The signed payload is `"<t>.<raw body>"`. Any `v1` entry may match.
/// Timestamps further than `tolerance_secs` from `now_unix` are rejected.
pub fn verify_stripe_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), CoreError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| CoreError::UpstreamPayment("Signature header has no timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(CoreError::UpstreamPayment(
            "Signature header has no v1 signature".to_string(),
        ));
    }
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(CoreError::UpstreamPayment(
            "Signature timestamp outside tolerance".to_string(),
        ));
    }

    let matched = candidates.iter().filter_map(|c| hex::decode(c)).any(|sig| {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&sig).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(CoreError::UpstreamPayment(
            "Signature verification failed".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// SSLCommerz
// ---------------------------------------------------------------------------

/// Merchant transaction id: `course_<courseId>_<userId>_<millis>`.
pub fn ssl_transaction_id(course_id: DbId, user_id: DbId, now_millis: i64) -> String {
    format!("course_{course_id}_{user_id}_{now_millis}")
}

/// `true` when a validation API status means the payment went through.
pub fn is_valid_ssl_status(status: &str) -> bool {
    SSL_VALID_STATUSES.contains(&status)
}

// ---------------------------------------------------------------------------
// hex helpers
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Decode a hex string. Returns `None` on odd length or non-hex input.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    fn header_for(timestamp: i64) -> String {
        format!(
            "t={timestamp},v1={}",
            compute_stripe_signature(SECRET, timestamp, BODY)
        )
    }

    #[test]
    fn valid_signature_is_accepted() {
        let header = header_for(1_700_000_000);
        assert!(verify_stripe_signature(&header, BODY, SECRET, 1_700_000_010, 300).is_ok());
    }

    #[test]
    fn any_v1_entry_may_match() {
        let good = compute_stripe_signature(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1={},v1={good}", "00".repeat(32));
        assert!(verify_stripe_signature(&header, BODY, SECRET, 1_700_000_000, 300).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = header_for(1_700_000_000);
        let result = verify_stripe_signature(&header, b"{}", SECRET, 1_700_000_000, 300);
        assert_matches!(result, Err(CoreError::UpstreamPayment(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = header_for(1_700_000_000);
        assert!(verify_stripe_signature(&header, BODY, "other", 1_700_000_000, 300).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = header_for(1_700_000_000);
        let result = verify_stripe_signature(&header, BODY, SECRET, 1_700_001_000, 300);
        assert_matches!(result, Err(CoreError::UpstreamPayment(msg)) if msg.contains("tolerance"));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(verify_stripe_signature("garbage", BODY, SECRET, 0, 300).is_err());
        assert!(verify_stripe_signature("t=1", BODY, SECRET, 1, 300).is_err());
        assert!(verify_stripe_signature("t=1,v1=zz", BODY, SECRET, 1, 300).is_err());
    }

    #[test]
    fn currency_normalization() {
        assert_eq!(normalize_currency(Some("usd")), "USD");
        assert_eq!(normalize_currency(Some(" bdt ")), "BDT");
        assert_eq!(normalize_currency(Some("")), DEFAULT_CURRENCY);
        assert_eq!(normalize_currency(None), DEFAULT_CURRENCY);
    }

    #[test]
    fn metadata_ids() {
        assert_eq!(parse_metadata_id(Some("42"), "courseId").unwrap(), 42);
        assert_matches!(
            parse_metadata_id(None, "courseId"),
            Err(CoreError::UpstreamPayment(msg)) if msg.contains("courseId")
        );
        assert!(parse_metadata_id(Some("abc"), "userId").is_err());
    }

    #[test]
    fn ssl_helpers() {
        assert_eq!(ssl_transaction_id(3, 8, 1_700_000_000_000), "course_3_8_1700000000000");
        assert!(is_valid_ssl_status("VALID"));
        assert!(is_valid_ssl_status("VALIDATED"));
        assert!(!is_valid_ssl_status("FAILED"));
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(hex::decode(&hex::encode([0u8, 171, 255])), Some(vec![0, 171, 255]));
        assert_eq!(hex::decode("abc"), None);
    }

    #[test]
    fn payment_method_wire_names() {
        assert_eq!(PaymentMethod::SslCommerz.as_str(), "sslcommerz");
        assert_eq!("stripe".parse::<PaymentMethod>().unwrap(), PaymentMethod::Stripe);
    }
}
