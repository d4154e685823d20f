use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CartItem;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddToCartPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Combined quantity after an add, checked against the stock ceiling.
pub fn combined_cart_quantity(existing: Option<i32>, requested: i32, stock: i32) -> Result<i32, AppError> {
  let new_qty = existing.unwrap_or(0) + requested;
  if new_qty > stock {
    return Err(AppError::Validation(format!(
      "Insufficient stock. Only {} available.",
      stock
    )));
  }
  Ok(new_qty)
}

#[instrument(
  name = "handler::add_to_cart",
  skip(state, payload),
  fields(user_id = %auth_user.user_id, product_id = %payload.product_id, quantity = %payload.quantity)
)]
pub async fn add_to_cart(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.quantity <= 0 {
    return Err(AppError::Validation("Quantity must be positive.".to_string()));
  }

  // The product row is locked for the whole read-check-upsert sequence,
  // so two concurrent adds of the same product serialize and neither the
  // increment nor the ceiling check can act on a stale quantity.
  let mut tx = state.db_pool.begin().await?;

  let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
    .bind(payload.product_id)
    .fetch_optional(&mut *tx)
    .await?;
  let stock = stock.ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", payload.product_id)))?;

  let existing_qty: Option<i32> = sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2")
    .bind(auth_user.user_id)
    .bind(payload.product_id)
    .fetch_optional(&mut *tx)
    .await?;

  let new_qty = combined_cart_quantity(existing_qty, payload.quantity, stock)?;

  let item: CartItem = sqlx::query_as(
    "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) VALUES ($1, $2, $3, $4, NOW()) \
     ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = $4 \
     RETURNING id, user_id, product_id, quantity, added_at",
  )
  .bind(Uuid::new_v4())
  .bind(auth_user.user_id)
  .bind(payload.product_id)
  .bind(new_qty)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;

  info!(item_id = %item.id, "Cart updated.");
  Ok(HttpResponse::Ok().json(json!({"message": "Item added to cart successfully.", "cartItem": item})))
}

#[instrument(name = "handler::view_cart", skip(state), fields(user_id = %auth_user.user_id))]
pub async fn view_cart(state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let rows: Vec<(Uuid, Uuid, i32, String, i64, i32)> = sqlx::query_as(
    "SELECT ci.id, ci.product_id, ci.quantity, p.title, p.price_cents, p.stock \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at ASC",
  )
  .bind(auth_user.user_id)
  .fetch_all(&state.db_pool)
  .await?;

  let items: Vec<serde_json::Value> = rows
    .into_iter()
    .map(|(id, product_id, quantity, title, price_cents, stock)| {
      json!({
        "id": id,
        "product_id": product_id,
        "quantity": quantity,
        "title": title,
        "price_cents": price_cents,
        "in_stock": stock >= quantity,
      })
    })
    .collect();

  Ok(HttpResponse::Ok().json(json!({"items": items})))
}

#[instrument(name = "handler::remove_cart_item", skip(state), fields(user_id = %auth_user.user_id, item_id = %path.as_ref()))]
pub async fn remove_cart_item(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
    .bind(item_id)
    .bind(auth_user.user_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Cart item not found.".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({"detail": "Item removed from cart"})))
}

#[instrument(name = "handler::clear_cart", skip(state), fields(user_id = %auth_user.user_id))]
pub async fn clear_cart(state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(auth_user.user_id)
    .execute(&state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({"detail": "Cart cleared"})))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn combined_quantity_adds_onto_the_existing_line() {
    assert_eq!(combined_cart_quantity(Some(2), 3, 10).unwrap(), 5);
    assert_eq!(combined_cart_quantity(None, 3, 10).unwrap(), 3);
    // Exactly at the ceiling is allowed.
    assert_eq!(combined_cart_quantity(Some(7), 3, 10).unwrap(), 10);
  }

  #[test]
  fn combined_quantity_beyond_stock_is_rejected() {
    let err = combined_cart_quantity(Some(8), 3, 10).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(combined_cart_quantity(None, 1, 0).is_err());
  }
}
