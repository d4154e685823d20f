use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderItem, OrderStatus, User};
use crate::services::mailer;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

const ORDER_COLUMNS: &str = "id, user_id, order_ref, status, total_amount_cents, shipping_address, \
   payment_method, gateway_order_id, gateway_payment_id, is_priority, priority_hours, created_at";

#[instrument(name = "handler::admin_stats", skip(state, _admin))]
pub async fn dashboard_stats(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
    .fetch_one(&state.db_pool)
    .await?;
  let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
    .fetch_one(&state.db_pool)
    .await?;
  let total_revenue: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(total_amount_cents), 0) FROM orders")
    .fetch_one(&state.db_pool)
    .await?;
  let pending_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
    .fetch_one(&state.db_pool)
    .await?;
  let delivered_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'delivered'")
    .fetch_one(&state.db_pool)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "total_users": total_users,
    "total_orders": total_orders,
    "total_revenue_cents": total_revenue,
    "pending_orders": pending_orders,
    "delivered_orders": delivered_orders,
  })))
}

#[instrument(name = "handler::admin_all_orders", skip(state, _admin))]
pub async fn all_orders(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let orders: Vec<Order> = sqlx::query_as(&format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS))
    .fetch_all(&state.db_pool)
    .await?;

  let mut result = Vec::with_capacity(orders.len());
  for order in orders {
    let items: Vec<OrderItem> = sqlx::query_as(
      "SELECT id, order_id, product_id, product_title, quantity, price_at_purchase_cents \
       FROM order_items WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_all(&state.db_pool)
    .await?;

    let customer: Option<(String, String)> = sqlx::query_as("SELECT username, email FROM users WHERE id = $1")
      .bind(order.user_id)
      .fetch_optional(&state.db_pool)
      .await?;

    result.push(json!({
      "id": order.id,
      "order_ref": order.order_ref,
      "status": order.status,
      "total_amount_cents": order.total_amount_cents,
      "payment_method": order.payment_method,
      "is_priority": order.is_priority,
      "priority_hours": order.priority_hours,
      "shipping_address": order.shipping_address,
      "created_at": order.created_at,
      "user": customer.map(|(username, email)| json!({"id": order.user_id, "username": username, "email": email})),
      "items": items,
    }));
  }

  Ok(HttpResponse::Ok().json(result))
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusPayload {
  pub status: String,
}

/// Sets an order's status. The status set is closed but transitions are
/// deliberately unrestricted (any state may move to any other). The
/// notification email fires only when the value actually changes, and its
/// failure never rolls the change back.
#[instrument(name = "handler::admin_update_order_status", skip(state, _admin, payload), fields(order_id = %path.as_ref(), new_status = %payload.status))]
pub async fn update_order_status(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let new_status =
    OrderStatus::parse(&payload.status).ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

  let order_id = path.into_inner();
  let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(order_id)
    .fetch_optional(&state.db_pool)
    .await?;
  let order = order.ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;

  if order.status != new_status {
    sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
      .bind(new_status)
      .bind(order_id)
      .execute(&state.db_pool)
      .await?;

    match sqlx::query_as::<_, (String, String)>("SELECT first_name, email FROM users WHERE id = $1")
      .bind(order.user_id)
      .fetch_optional(&state.db_pool)
      .await?
    {
      Some((first_name, email)) => {
        let (subject, html) = mailer::order_status_email(&first_name, &order.order_ref, new_status.as_str());
        state.mailer.send_fire_and_forget(email, subject, html);
      }
      None => warn!(order_id = %order_id, "Order owner missing; skipping status email."),
    }

    info!(order_ref = %order.order_ref, "Order status updated.");
  }

  Ok(HttpResponse::Ok().json(json!({"success": true, "new_status": new_status})))
}

#[instrument(name = "handler::admin_all_users", skip(state, _admin))]
pub async fn all_users(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let users: Vec<User> = sqlx::query_as(
    "SELECT id, username, email, first_name, last_name, password_hash, is_staff, is_superuser, date_joined \
     FROM users ORDER BY date_joined DESC",
  )
  .fetch_all(&state.db_pool)
  .await?;

  let mut result = Vec::with_capacity(users.len());
  for user in &users {
    let phone: Option<String> = sqlx::query_scalar("SELECT phone FROM profiles WHERE user_id = $1")
      .bind(user.id)
      .fetch_optional(&state.db_pool)
      .await?;

    result.push(json!({
      "id": user.id,
      "username": user.username,
      "email": user.email,
      "first_name": user.first_name,
      "last_name": user.last_name,
      "is_staff": user.is_staff,
      "is_superuser": user.is_superuser,
      "date_joined": user.date_joined,
      "phone": phone.unwrap_or_default(),
    }));
  }

  Ok(HttpResponse::Ok().json(result))
}

/// Toggles staff status. Superusers are protected from demotion.
#[instrument(name = "handler::admin_toggle_staff", skip(state, _admin), fields(target_user_id = %path.as_ref()))]
pub async fn toggle_staff_status(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let target_id = path.into_inner();
  let user: Option<User> = sqlx::query_as(
    "SELECT id, username, email, first_name, last_name, password_hash, is_staff, is_superuser, date_joined \
     FROM users WHERE id = $1",
  )
  .bind(target_id)
  .fetch_optional(&state.db_pool)
  .await?;
  let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

  if user.is_superuser {
    return Err(AppError::Forbidden("Cannot change status of a Super Admin".to_string()));
  }

  let new_is_staff = !user.is_staff;
  sqlx::query("UPDATE users SET is_staff = $1 WHERE id = $2")
    .bind(new_is_staff)
    .bind(user.id)
    .execute(&state.db_pool)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "id": user.id,
    "is_staff": new_is_staff,
    "message": format!(
      "User {} is now {}",
      user.username,
      if new_is_staff { "an Admin" } else { "a User" }
    ),
  })))
}
