//! Payment-gateway adapter: order creation over HTTP and webhook-style
//! signature verification (HMAC-SHA256 over `"{order_id}|{payment_id}"`,
//! hex-encoded, Razorpay-compatible).

use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{info, instrument};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
}

pub struct GatewayClient {
  api_base: String,
  key_id: String,
  key_secret: String,
  http: reqwest::Client,
}

impl GatewayClient {
  pub fn new(api_base: String, key_id: String, key_secret: String, http: reqwest::Client) -> Self {
    Self {
      api_base,
      key_id,
      key_secret,
      http,
    }
  }

  pub fn key_id(&self) -> &str {
    &self.key_id
  }

  /// Creates a gateway-side order for the given amount in minor units.
  /// No local order row is created at this stage; an abandoned payment
  /// must leave no trace in the order table.
  #[instrument(name = "payments::create_gateway_order", skip(self), err(Display))]
  pub async fn create_order(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<GatewayOrder> {
    if amount_minor <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero".to_string()));
    }

    let url = format!("{}/orders", self.api_base);
    let resp = self
      .http
      .post(&url)
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&json!({
        "amount": amount_minor,
        "currency": currency,
        "receipt": receipt,
        "payment_capture": 1,
      }))
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("Order creation request failed: {}", e)))?;

    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(AppError::Gateway(format!(
        "Gateway rejected order creation ({}): {}",
        status, body
      )));
    }

    let order: GatewayOrder = resp
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unparseable gateway response: {}", e)))?;
    info!(gateway_order_id = %order.id, "Gateway order created.");
    Ok(order)
  }

  /// Verifies the signature the gateway attached to a completed payment.
  /// Comparison is constant-time via `Mac::verify_slice`.
  pub fn verify_payment_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature_hex: &str) -> bool {
    verify_signature(&self.key_secret, gateway_order_id, gateway_payment_id, signature_hex)
  }
}

// Operates on byte pairs, not string slices: the signature comes straight
// from the request body and may contain multi-byte characters.
fn decode_hex(s: &str) -> Option<Vec<u8>> {
  if s.is_empty() || s.len() % 2 != 0 {
    return None;
  }
  s.as_bytes()
    .chunks_exact(2)
    .map(|pair| {
      let digits = std::str::from_utf8(pair).ok()?;
      u8::from_str_radix(digits, 16).ok()
    })
    .collect()
}

fn verify_signature(secret: &str, gateway_order_id: &str, gateway_payment_id: &str, signature_hex: &str) -> bool {
  let Some(sig) = decode_hex(signature_hex) else {
    return false;
  };
  let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
    return false;
  };
  mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
  mac.verify_slice(&sig).is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "gateway-test-secret";

  fn sign(order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("hmac");
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    mac
      .finalize()
      .into_bytes()
      .iter()
      .map(|b| format!("{:02x}", b))
      .collect()
  }

  #[test]
  fn valid_signature_is_accepted() {
    let sig = sign("order_abc", "pay_123");
    assert!(verify_signature(SECRET, "order_abc", "pay_123", &sig));
  }

  #[test]
  fn signature_over_different_ids_is_rejected() {
    let sig = sign("order_abc", "pay_123");
    assert!(!verify_signature(SECRET, "order_abc", "pay_999", &sig));
    assert!(!verify_signature(SECRET, "order_xyz", "pay_123", &sig));
  }

  #[test]
  fn signature_with_wrong_secret_is_rejected() {
    let sig = sign("order_abc", "pay_123");
    assert!(!verify_signature("another-secret", "order_abc", "pay_123", &sig));
  }

  #[test]
  fn malformed_signatures_are_rejected() {
    assert!(!verify_signature(SECRET, "order_abc", "pay_123", ""));
    assert!(!verify_signature(SECRET, "order_abc", "pay_123", "zz"));
    assert!(!verify_signature(SECRET, "order_abc", "pay_123", "abc")); // odd length
  }

  #[test]
  fn decode_hex_round_trips() {
    assert_eq!(decode_hex("00ff10"), Some(vec![0x00, 0xff, 0x10]));
    assert_eq!(decode_hex(""), None);
    assert_eq!(decode_hex("0"), None);
    assert_eq!(decode_hex("0g"), None);
  }

  #[test]
  fn non_ascii_signatures_are_rejected_without_panicking() {
    // Multi-byte characters must decode to a mismatch, never a panic,
    // regardless of where their byte boundaries fall.
    assert_eq!(decode_hex("a\u{e9}b"), None);
    assert_eq!(decode_hex("\u{e9}\u{e9}"), None);
    assert!(!verify_signature(SECRET, "order_abc", "pay_123", "a\u{e9}b"));
    assert!(!verify_signature(SECRET, "order_abc", "pay_123", "日本語テスト"));
  }
}
