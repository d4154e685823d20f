//! Order placement: stock reservation under row-level locking and
//! human-readable order-reference generation.
//!
//! Both the COD path and the post-payment path funnel through
//! [`place_order`]; they differ only in the initial status and the recorded
//! gateway ids. Stock decrement and line-item creation happen inside one
//! transaction with each product row locked (`SELECT ... FOR UPDATE`)
//! before its stock is checked, so concurrent submissions can never
//! oversell the last unit.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentMethod};
use chrono::{Datelike, Utc};
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

pub const ORDER_REF_PREFIX: &str = "MAKERMART";
const ORDER_REF_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_REF_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct NewOrderLine {
  pub product_id: Uuid,
  pub qty: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub lines: Vec<NewOrderLine>,
  pub total_amount_cents: i64,
  pub shipping_address: serde_json::Value,
  pub payment_method: PaymentMethod,
  pub initial_status: OrderStatus,
  pub gateway_order_id: Option<String>,
  pub gateway_payment_id: Option<String>,
  pub is_priority: bool,
  pub priority_hours: Option<i32>,
}

/// The committed order plus `(title, qty, price)` snapshots for the
/// confirmation email.
#[derive(Debug)]
pub struct PlacedOrder {
  pub order: Order,
  pub lines: Vec<(String, i32, i64)>,
}

pub fn random_suffix<R: Rng>(rng: &mut R) -> String {
  (0..ORDER_REF_SUFFIX_LEN)
    .map(|_| ORDER_REF_CHARSET[rng.gen_range(0..ORDER_REF_CHARSET.len())] as char)
    .collect()
}

pub fn format_order_ref(year: i32, suffix: &str) -> String {
  format!("{}-{}-{}", ORDER_REF_PREFIX, year, suffix)
}

/// Samples `MAKERMART-{year}-{6 alnum}` candidates until one is free.
/// Unbounded retry; at 36^6 candidates per year a collision streak is not
/// a practical concern.
async fn generate_unique_order_ref(tx: &mut Transaction<'_, Postgres>) -> Result<String> {
  let year = Utc::now().year();
  loop {
    let candidate = format_order_ref(year, &random_suffix(&mut rand::thread_rng()));
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_ref = $1)")
      .bind(&candidate)
      .fetch_one(&mut **tx)
      .await?;
    if !exists {
      return Ok(candidate);
    }
  }
}

#[derive(Debug, sqlx::FromRow)]
struct LockedProduct {
  id: Uuid,
  title: String,
  price_cents: i64,
  stock: i32,
}

/// Rejects structurally invalid orders before any database work.
pub fn validate_new_order(new_order: &NewOrder) -> Result<()> {
  if new_order.lines.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item.".to_string()));
  }
  if new_order.lines.iter().any(|l| l.qty <= 0) {
    return Err(AppError::Validation("Item quantities must be positive.".to_string()));
  }
  if new_order.total_amount_cents <= 0 {
    return Err(AppError::Validation("Order total must be greater than zero.".to_string()));
  }
  Ok(())
}

#[instrument(name = "checkout::place_order", skip(pool, new_order), fields(user_id = %new_order.user_id, line_count = new_order.lines.len()))]
pub async fn place_order(pool: &PgPool, new_order: NewOrder) -> Result<PlacedOrder> {
  validate_new_order(&new_order)?;

  let mut tx = pool.begin().await?;

  let order_ref = generate_unique_order_ref(&mut tx).await?;

  let order: Order = sqlx::query_as(
    "INSERT INTO orders (id, user_id, order_ref, status, total_amount_cents, shipping_address, \
       payment_method, gateway_order_id, gateway_payment_id, is_priority, priority_hours, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()) \
     RETURNING id, user_id, order_ref, status, total_amount_cents, shipping_address, \
       payment_method, gateway_order_id, gateway_payment_id, is_priority, priority_hours, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(new_order.user_id)
  .bind(&order_ref)
  .bind(new_order.initial_status)
  .bind(new_order.total_amount_cents)
  .bind(&new_order.shipping_address)
  .bind(new_order.payment_method)
  .bind(&new_order.gateway_order_id)
  .bind(&new_order.gateway_payment_id)
  .bind(new_order.is_priority)
  .bind(new_order.priority_hours)
  .fetch_one(&mut *tx)
  .await?;

  let mut snapshots = Vec::with_capacity(new_order.lines.len());
  for line in &new_order.lines {
    // Lock the product row before the stock check; an insufficient line
    // aborts the whole transaction, releasing every reservation made so far.
    let product: Option<LockedProduct> =
      sqlx::query_as("SELECT id, title, price_cents, stock FROM products WHERE id = $1 FOR UPDATE")
        .bind(line.product_id)
        .fetch_optional(&mut *tx)
        .await?;

    let product = product.ok_or_else(|| {
      AppError::Validation(format!(
        "Product with ID {} no longer exists. Please clear your cart.",
        line.product_id
      ))
    })?;

    if product.stock < line.qty {
      return Err(AppError::Validation(format!(
        "Insufficient stock for {}. Only {} left.",
        product.title, product.stock
      )));
    }

    sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
      .bind(line.qty)
      .bind(product.id)
      .execute(&mut *tx)
      .await?;

    sqlx::query(
      "INSERT INTO order_items (id, order_id, product_id, product_title, quantity, price_at_purchase_cents) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(order.id)
    .bind(product.id)
    .bind(&product.title)
    .bind(line.qty)
    .bind(product.price_cents)
    .execute(&mut *tx)
    .await?;

    snapshots.push((product.title, line.qty, product.price_cents));
  }

  tx.commit().await?;
  info!(order_ref = %order.order_ref, order_id = %order.id, "Order placed.");

  Ok(PlacedOrder {
    order,
    lines: snapshots,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn suffix_is_six_chars_from_the_uppercase_alnum_charset() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
      let suffix = random_suffix(&mut rng);
      assert_eq!(suffix.len(), ORDER_REF_SUFFIX_LEN);
      assert!(suffix.bytes().all(|b| ORDER_REF_CHARSET.contains(&b)), "{}", suffix);
    }
  }

  #[test]
  fn order_ref_format() {
    assert_eq!(format_order_ref(2026, "A1B2C3"), "MAKERMART-2026-A1B2C3");
  }

  #[test]
  fn suffix_sampling_is_not_degenerate() {
    // 200 draws from a 36^6 space should never repeat.
    let mut rng = StdRng::seed_from_u64(7);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
      assert!(seen.insert(random_suffix(&mut rng)));
    }
  }

  fn new_order(lines: Vec<NewOrderLine>, total_amount_cents: i64) -> NewOrder {
    NewOrder {
      user_id: Uuid::new_v4(),
      lines,
      total_amount_cents,
      shipping_address: serde_json::json!({"city": "Chennai"}),
      payment_method: PaymentMethod::Cod,
      initial_status: OrderStatus::Pending,
      gateway_order_id: None,
      gateway_payment_id: None,
      is_priority: false,
      priority_hours: None,
    }
  }

  fn line(qty: i32) -> NewOrderLine {
    NewOrderLine {
      product_id: Uuid::new_v4(),
      qty,
    }
  }

  #[test]
  fn orders_without_lines_are_rejected() {
    let err = validate_new_order(&new_order(vec![], 1000)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }

  #[test]
  fn non_positive_quantities_are_rejected() {
    assert!(validate_new_order(&new_order(vec![line(0)], 1000)).is_err());
    assert!(validate_new_order(&new_order(vec![line(2), line(-1)], 1000)).is_err());
    assert!(validate_new_order(&new_order(vec![line(2)], 1000)).is_ok());
  }

  #[test]
  fn non_positive_totals_are_rejected() {
    assert!(validate_new_order(&new_order(vec![line(1)], 0)).is_err());
    assert!(validate_new_order(&new_order(vec![line(1)], -500)).is_err());
  }
}
