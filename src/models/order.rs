use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// The closed set of order states. Any state may move to any other;
/// the transition itself is what triggers a (best-effort) notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Shipped,
  Delivered,
}

impl OrderStatus {
  /// Parses the wire form used by the admin status-update endpoint.
  /// Anything outside the four known values is rejected by the caller.
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "pending" => Some(OrderStatus::Pending),
      "paid" => Some(OrderStatus::Paid),
      "shipped" => Some(OrderStatus::Shipped),
      "delivered" => Some(OrderStatus::Delivered),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cod,
  Online,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  /// Human-readable unique reference, e.g. `MAKERMART-2026-A1B2C3`.
  pub order_ref: String,
  pub status: OrderStatus,
  pub total_amount_cents: i64,
  pub shipping_address: serde_json::Value,
  pub payment_method: PaymentMethod,
  pub gateway_order_id: Option<String>,
  pub gateway_payment_id: Option<String>,
  pub is_priority: bool,
  pub priority_hours: Option<i32>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_accepts_only_the_four_known_statuses() {
    assert_eq!(OrderStatus::parse("pending"), Some(OrderStatus::Pending));
    assert_eq!(OrderStatus::parse("paid"), Some(OrderStatus::Paid));
    assert_eq!(OrderStatus::parse("shipped"), Some(OrderStatus::Shipped));
    assert_eq!(OrderStatus::parse("delivered"), Some(OrderStatus::Delivered));
    assert_eq!(OrderStatus::parse("cancelled"), None);
    assert_eq!(OrderStatus::parse("PAID"), None);
    assert_eq!(OrderStatus::parse(""), None);
  }

  #[test]
  fn as_str_round_trips_through_parse() {
    for status in [
      OrderStatus::Pending,
      OrderStatus::Paid,
      OrderStatus::Shipped,
      OrderStatus::Delivered,
    ] {
      assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
    }
  }
}
